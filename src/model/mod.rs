pub mod delegation;
pub mod designation;
pub mod employee;
pub mod leave_approval;
pub mod leave_request;
pub mod role;
