//! The class hierarchy of a forest.
//!
//! It is computed outside of this crate, a tree only carries it along.
//! Its file starts with the number of nodes, followed by
//! `id left_child right_child linkage parent subclass_count subclass*`
//! for every node (-1 for missing children and parents).

use std::io::{Read, Write};
use std::path::Path;

use errors::*;
use hough::tree::Tree;
use hough::treefile::{Tokens, create, index_str, open};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub id: usize,
    pub left_child: Option<usize>,
    pub right_child: Option<usize>,
    /// Distance at which both children were merged
    pub linkage: f32,
    pub parent: Option<usize>,
    /// Class ids below this node
    pub subclasses: Vec<i32>,
}

/// Reads the nodes of a hierarchy
pub fn read_hierarchy<R: Read>(mut reader: R) -> Result<Vec<HierarchyNode>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let mut t = Tokens::new(&text);
    let n: usize = t.next("number of hierarchy nodes")?;
    let mut nodes = Vec::new();
    for _ in 0..n {
        let id = t.next("hierarchy id")?;
        let left_child = t.next_index("hierarchy left child")?;
        let right_child = t.next_index("hierarchy right child")?;
        let linkage = t.next("linkage")?;
        let parent = t.next_index("hierarchy parent")?;
        let count: usize = t.next("subclass count")?;
        let mut subclasses = Vec::new();
        for _ in 0..count {
            subclasses.push(t.next("subclass")?);
        }
        nodes.push(HierarchyNode {
            id: id,
            left_child: left_child,
            right_child: right_child,
            linkage: linkage,
            parent: parent,
            subclasses: subclasses,
        });
    }
    Ok(nodes)
}

pub fn write_hierarchy<W: Write>(nodes: &[HierarchyNode], w: &mut W) -> Result<()> {
    writeln!(w, "{}", nodes.len())?;
    for node in nodes.iter() {
        let subclasses: Vec<String> = node.subclasses.iter().map(|s| s.to_string()).collect();
        writeln!(w,
                 "{} {} {} {} {} {} {}",
                 node.id,
                 index_str(node.left_child),
                 index_str(node.right_child),
                 node.linkage,
                 index_str(node.parent),
                 node.subclasses.len(),
                 subclasses.join(" "))?;
    }
    Ok(())
}

impl Tree {
    /// Loads the class hierarchy of this tree.
    /// The tree is not changed if the file is invalid.
    pub fn load_hierarchy<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!("Load hierarchy {}", path.display());
        let reader = open(path, "hierarchy")?;
        self.hierarchy = read_hierarchy(reader)
            .chain_err(|| format!("invalid hierarchy file {}", path.display()))?;
        Ok(())
    }

    pub fn save_hierarchy<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!("Save hierarchy {}", path.display());
        let mut writer = create(path, "hierarchy")?;
        write_hierarchy(&self.hierarchy, &mut writer)
            .and_then(|_| writer.flush().map_err(Error::from))
            .chain_err(|| format!("could not write hierarchy file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hough::tree::tests::small_tree;
    use std::env;
    use std::fs;
    use std::io::Cursor;

    fn hierarchy() -> Vec<HierarchyNode> {
        vec![HierarchyNode {
                 id: 0,
                 left_child: None,
                 right_child: None,
                 linkage: 0.0,
                 parent: Some(2),
                 subclasses: vec![1],
             },
             HierarchyNode {
                 id: 1,
                 left_child: None,
                 right_child: None,
                 linkage: 0.0,
                 parent: Some(2),
                 subclasses: vec![2],
             },
             HierarchyNode {
                 id: 2,
                 left_child: Some(0),
                 right_child: Some(1),
                 linkage: 0.35,
                 parent: None,
                 subclasses: vec![1, 2],
             }]
    }

    #[test]
    fn test_read() {
        let text = "2\n0 -1 -1 0 1 1 5\n1 -1 0 1.5 -1 2 5 6\n";
        let nodes = read_hierarchy(Cursor::new(text)).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].parent, Some(1));
        assert_eq!(nodes[1].left_child, None);
        assert_eq!(nodes[1].right_child, Some(0));
        assert_eq!(nodes[1].linkage, 1.5);
        assert_eq!(nodes[1].subclasses, vec![5, 6]);
    }

    #[test]
    fn test_huge_counts() {
        match read_hierarchy(Cursor::new("18446744073709551615\n")) {
            Err(Error(ErrorKind::UnexpectedEnd("hierarchy id"), _)) => (),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
        match read_hierarchy(Cursor::new("1\n0 -1 -1 0 -1 18446744073709551615 4\n")) {
            Err(Error(ErrorKind::UnexpectedEnd("subclass"), _)) => (),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_file_round_trip() {
        let mut tree = small_tree();
        tree.hierarchy = hierarchy();
        let path = env::temp_dir().join(format!("posehough_hierarchy_{}.txt", ::std::process::id()));
        tree.save_hierarchy(&path).unwrap();
        let mut loaded = small_tree();
        loaded.load_hierarchy(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(loaded.hierarchy, hierarchy());
    }

    #[test]
    fn test_invalid_hierarchy() {
        let mut tree = small_tree();
        tree.hierarchy = hierarchy();
        let path = env::temp_dir().join(format!("posehough_bad_hierarchy_{}.txt", ::std::process::id()));
        fs::write(&path, "3\n0 -1 -1 0.0 2 1").unwrap();
        assert!(tree.load_hierarchy(&path).is_err());
        fs::remove_file(&path).unwrap();
        assert_eq!(tree.hierarchy, hierarchy());
        assert!(tree.load_hierarchy(env::temp_dir().join("posehough_missing.txt")).is_err());
    }
}
