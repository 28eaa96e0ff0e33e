pub mod history;
pub mod seed;

pub use history::history;
pub use seed::seed_demo_data;
