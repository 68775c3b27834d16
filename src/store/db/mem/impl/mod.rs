mod execution;
mod flow;
