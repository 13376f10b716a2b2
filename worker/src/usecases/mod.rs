pub mod charge_workflow;
