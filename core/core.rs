pub mod assemble;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod ignore_oracle;
pub mod manual;
pub mod path_info;
pub mod rules;
pub mod scan_result;
pub mod tree;
pub mod walk;

pub use assemble::OutputAssembler;
pub use config::{Config, ProjectConfig};
pub use error::{AppError, ItemError, Result};
pub use exclusion::{Decision, ExclusionEngine, ExclusionReason, Excluder};
pub use ignore_oracle::{IgnoreFileOracle, IgnoreOracle};
pub use path_info::PathInfo;
pub use rules::{ExtensionSet, RuleScope, RuleSet};
pub use scan_result::{Exclusion, FileInfo, ScanAccumulator, ScanResult};
pub use tree::{NodeKind, TreeNode, build_tree};
pub use walk::{
    DirPruner, ScanReport, ScanRequest, WalkCoordinator, WalkEvent, run_scan, run_scan_with,
    spawn_pruned_traversal, spawn_traversal,
};
