// Domain layer - Records, inputs and the cycle simulator
pub mod ai;
pub mod alert;
pub mod cnc_cycle;
pub mod cnc_telemetry;
pub mod machine;
pub mod maintenance;
pub mod site;
pub mod telemetry;
