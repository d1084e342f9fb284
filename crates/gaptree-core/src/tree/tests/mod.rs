mod support;

mod property_bounds_tests;
mod solver_tests;
