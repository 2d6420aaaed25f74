
mod scenario_test;
