use crate::scan_result::FileInfo;
use log;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Bytes of the file, or of every included file below a directory.
    pub size: u64,
    pub manual: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn directory(name: &str) -> Self {
        TreeNode {
            name: name.to_string(),
            kind: NodeKind::Directory,
            size: 0,
            manual: false,
            children: Vec::new(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// CWD-relative directory tree of the included files, children sorted by name.
pub fn build_tree(files: &[FileInfo]) -> Vec<TreeNode> {
    log::debug!("Building summary tree from {} files...", files.len());
    let mut roots: Vec<TreeNode> = Vec::new();
    for file in files {
        let components: Vec<&str> = file
            .path
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .collect();
        if components.is_empty() {
            continue;
        }
        insert_node(&mut roots, &components, file);
    }
    roots
}

fn insert_node(level: &mut Vec<TreeNode>, components: &[&str], file: &FileInfo) {
    let Some((name, rest)) = components.split_first() else {
        return;
    };

    let index = match level.binary_search_by(|node| node.name.as_str().cmp(*name)) {
        Ok(index) => index,
        Err(insertion_point) => {
            let node = if rest.is_empty() {
                TreeNode {
                    name: name.to_string(),
                    kind: NodeKind::File,
                    size: 0,
                    manual: file.manual,
                    children: Vec::new(),
                }
            } else {
                TreeNode::directory(name)
            };
            level.insert(insertion_point, node);
            insertion_point
        }
    };

    let node = &mut level[index];
    node.size += file.size;
    if rest.is_empty() {
        return;
    }
    if node.kind == NodeKind::File {
        // A file and a directory of the same name cannot both be CWD-relative
        // entries; keep the first and move on.
        log::warn!("Tree conflict at '{}' while inserting {}", name, file.path);
        return;
    }
    insert_node(&mut node.children, rest, file);
}
