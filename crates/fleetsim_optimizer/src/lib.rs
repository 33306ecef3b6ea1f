pub mod dispatch;
pub mod objective;
pub mod pareto;
pub mod problem;
pub mod scheduler;
pub mod solution;

#[cfg(test)]
pub(crate) mod test_utils;
