mod test_clock;
mod test_ghost_runner;
mod test_goal_watcher;
mod test_lap_tracker;
mod test_step_integrator;
