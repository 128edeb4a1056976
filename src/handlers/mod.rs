pub mod auth;
pub mod branches;
pub mod buses;
pub mod company;
pub mod fees;
pub mod health;
pub mod institutions;
pub mod inventory;
pub mod parent;
pub mod staff;
pub mod students;
