//! 推理层：由检索到的上下文产生下一步决策

pub mod planner;

pub use planner::{Planner, ReasonContext};
