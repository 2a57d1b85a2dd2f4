pub mod categorize;
pub mod cloze;
pub mod comprehension;
pub mod saved;
