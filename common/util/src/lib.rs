
/// Assert that every message occurs in `content`, each after the previous one.
#[cfg(any(test, feature = "testing"))]
#[macro_export]
macro_rules! assert_contains_inorder {
    ($content:expr, [$($message:expr),* $(,)?]) => {{
        let content: &str = &$content;
        let mut remaining = content;
        $(
            match remaining.find($message) {
                Some(index) => remaining = &remaining[index + $message.len()..],
                None => panic!("message not found, or out of order. message: {:?}, content: {}", $message, content),
            }
        )*
        let _ = remaining;
    }};
}
