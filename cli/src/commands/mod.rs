pub mod cli;
pub mod logs;
pub mod run;
pub mod serve;
