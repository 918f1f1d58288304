pub mod ascii;
pub mod history;
