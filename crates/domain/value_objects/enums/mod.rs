pub mod qr_code_states;
pub mod qr_shapes;
pub mod qr_types;
pub mod sort_order;
pub mod subscription_statuses;
