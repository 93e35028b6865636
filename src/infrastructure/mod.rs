pub mod compare_condition;
pub mod fake_transport;
pub mod logging_action;
pub mod reqwest_transport;
pub mod schedule_trigger;
pub mod script_transform;
pub mod simple_input;
pub mod var_template;
pub mod webhook_action;
