pub mod screening;
pub mod analysis;
pub mod validation;
pub mod verdict;
pub mod runner; // One analysis → transform → validation cycle
