pub mod assumptions;
pub mod controller;
pub mod dcf;
pub mod enterprise_value;
