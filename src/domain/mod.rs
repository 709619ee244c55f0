pub mod confirmation;
pub mod ids;
pub mod track;
pub mod upload;
