pub mod emotion;
pub mod external_step;
pub mod intent;
pub mod memory_recall;
pub mod reasoning;
pub mod tools;
