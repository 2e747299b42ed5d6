pub mod scan;
pub mod xdom;
