mod common;
mod service_loads;
