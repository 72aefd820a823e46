mod reducer;
