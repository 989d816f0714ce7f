pub mod answer;
pub mod executions;
pub mod live2d;
pub mod task;
pub mod vector_proxy;
