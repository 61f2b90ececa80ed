//! # 常用接口模块
//!
//! 单元测试用的断言宏与少量文件工具


pub mod macro_for_unit_test;
