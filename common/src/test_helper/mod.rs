pub mod test_wall_clock;
