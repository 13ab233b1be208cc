//! The text format of a tree.
//!
//! All values are separated by whitespace:
//!
//! ```text
//! scale max_depth num_nodes num_leaves num_labels
//! class_id * num_labels
//! num_nodes * (id depth is_leaf parent left_child right_child t0 t1 t2 t3 t4 t5)
//! num_leaves * (id depth parent background_confidence
//!               num_labels * (probability sample_count
//!                             [class_id != 0: sample_count * (ox oy oz qw qx qy qz)]))
//! ```
//!
//! Missing parents and children are written as -1, a leaf node stores
//! the index of its leaf as left child.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

use errors::*;
use hough::binary_test::SplitTest;
use hough::leaf::{LeafNode, Vote};
use hough::tree::{InternalNode, NodeKind, Tree};
use linalg::Vec3;
use quaternion::Quaternion;

/// Reads whitespace separated values
pub struct Tokens<'a> {
    iter: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    pub fn new(text: &'a str) -> Tokens<'a> {
        Tokens { iter: text.split_whitespace() }
    }

    /// Parses the next value, `field` names it in errors.
    pub fn next<T: FromStr>(&mut self, field: &'static str) -> Result<T> {
        let token = self.iter.next().ok_or(ErrorKind::UnexpectedEnd(field))?;
        token.parse()
            .map_err(|_| ErrorKind::InvalidToken(field, token.to_string()).into())
    }

    /// An index where -1 means none
    pub fn next_index(&mut self, field: &'static str) -> Result<Option<usize>> {
        let v: i64 = self.next(field)?;
        match v {
            -1 => Ok(None),
            v if v >= 0 => Ok(Some(v as usize)),
            v => bail!(ErrorKind::InvalidToken(field, v.to_string())),
        }
    }
}

/// Writes an optional index, -1 for none
pub fn index_str(idx: Option<usize>) -> String {
    match idx {
        Some(i) => i.to_string(),
        None => "-1".to_string(),
    }
}

/// Opens a file for reading. Failures are logged and carry the path.
pub fn open(path: &Path, what: &str) -> Result<BufReader<File>> {
    match File::open(path) {
        Ok(f) => Ok(BufReader::new(f)),
        Err(e) => {
            warn!("Could not open {} file {}", what, path.display());
            Err(e).chain_err(|| format!("could not open {} file {}", what, path.display()))
        }
    }
}

/// Creates a file for writing, the error carries the path.
pub fn create(path: &Path, what: &str) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .chain_err(|| format!("could not create {} file {}", what, path.display()))?;
    Ok(BufWriter::new(file))
}

impl Tree {
    /// Loads a tree from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Tree> {
        let path = path.as_ref();
        info!("Load tree {}", path.display());
        let reader = open(path, "tree")?;
        let tree = Tree::read_from(reader).chain_err(|| format!("invalid tree file {}", path.display()))?;
        info!("Loaded tree with {} nodes and {} leaves",
              tree.num_nodes(),
              tree.num_leaves());
        Ok(tree)
    }

    /// Saves the tree into a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!("Save tree {}", path.display());
        let mut writer = create(path, "tree")?;
        self.write_to(&mut writer)
            .and_then(|_| writer.flush().map_err(Error::from))
            .chain_err(|| format!("could not write tree file {}", path.display()))
    }

    /// Reads a tree and checks its structure.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Tree> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let mut t = Tokens::new(&text);

        let scale: f32 = t.next("scale")?;
        let max_depth: usize = t.next("max depth")?;
        let num_nodes: usize = t.next("number of nodes")?;
        let num_leaves: usize = t.next("number of leaves")?;
        let num_labels: usize = t.next("number of labels")?;

        let mut class_ids = Vec::new();
        for _ in 0..num_labels {
            class_ids.push(t.next("class id")?);
        }
        let mut tree = Tree::new(scale, max_depth, class_ids);

        for n in 0..num_nodes {
            let node = read_node(&mut t)?;
            if node.id != n {
                bail!(ErrorKind::InvalidNode(node.id));
            }
            tree.nodes.push(node);
        }
        for _ in 0..num_leaves {
            let leaf = read_leaf(&mut t, &tree.class_ids)?;
            tree.leaves.push(leaf);
        }

        tree.validate()?;
        Ok(tree)
    }

    /// Writes the tree in the text format
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        self.validate()?;
        writeln!(w,
                 "{} {} {} {} {}",
                 self.scale,
                 self.max_depth,
                 self.num_nodes(),
                 self.num_leaves(),
                 self.num_labels())?;
        let ids: Vec<String> = self.class_ids.iter().map(|c| c.to_string()).collect();
        writeln!(w, "{}", ids.join(" "))?;

        for node in self.nodes.iter() {
            let (is_leaf, left, right) = match node.kind {
                NodeKind::Split { left, right } => (0, Some(left), Some(right)),
                NodeKind::Leaf(l) => (1, Some(l), None),
                NodeKind::Pending => bail!(ErrorKind::InvalidNode(node.id)),
            };
            let params: Vec<String> = node.test.to_params().iter().map(|p| p.to_string()).collect();
            writeln!(w,
                     "{} {} {} {} {} {} {}",
                     node.id,
                     node.depth,
                     is_leaf,
                     index_str(node.parent),
                     index_str(left),
                     index_str(right),
                     params.join(" "))?;
        }
        writeln!(w)?;

        for leaf in self.leaves.iter() {
            writeln!(w,
                     "{} {} {} {}",
                     leaf.id,
                     leaf.depth,
                     index_str(leaf.parent),
                     leaf.background_confidence)?;
            for c in 0..self.num_labels() {
                writeln!(w, "{} {}", leaf.label_probability[c], leaf.sample_count[c])?;
                if self.class_ids[c] == 0 {
                    continue;
                }
                for v in leaf.votes[c].iter() {
                    let q = v.orientation;
                    writeln!(w,
                             "{} {} {} {} {} {} {}",
                             v.offset[0],
                             v.offset[1],
                             v.offset[2],
                             q.w,
                             q.x,
                             q.y,
                             q.z)?;
                }
            }
        }
        Ok(())
    }
}

fn read_node(t: &mut Tokens) -> Result<InternalNode> {
    let id: usize = t.next("node id")?;
    let depth: usize = t.next("node depth")?;
    let is_leaf: u8 = t.next("leaf flag")?;
    let parent = t.next_index("node parent")?;
    let left = t.next_index("left child")?;
    let right = t.next_index("right child")?;
    let mut params = [0i32; 6];
    for p in params.iter_mut() {
        *p = t.next("test parameter")?;
    }
    let kind = match (is_leaf, left, right) {
        (1, Some(l), None) => NodeKind::Leaf(l),
        (0, Some(left), Some(right)) => NodeKind::Split { left: left, right: right },
        _ => bail!(ErrorKind::InvalidNode(id)),
    };
    Ok(InternalNode {
        id: id,
        depth: depth,
        parent: parent,
        kind: kind,
        test: SplitTest::from_params(params),
    })
}

fn read_leaf(t: &mut Tokens, class_ids: &[i32]) -> Result<LeafNode> {
    let id: usize = t.next("leaf id")?;
    let depth: usize = t.next("leaf depth")?;
    let parent = t.next_index("leaf parent")?;
    let background_confidence: f32 = t.next("background confidence")?;

    let mut label_probability = Vec::with_capacity(class_ids.len());
    let mut sample_count = Vec::with_capacity(class_ids.len());
    let mut votes = Vec::with_capacity(class_ids.len());
    for &cid in class_ids.iter() {
        label_probability.push(t.next("label probability")?);
        let count: usize = t.next("sample count")?;
        sample_count.push(count);
        if cid == 0 {
            votes.push(vec![]);
            continue;
        }
        let weight = 1.0 / count as f32;
        let mut class_votes = Vec::new();
        for _ in 0..count {
            let offset = Vec3([t.next("vote offset")?, t.next("vote offset")?, t.next("vote offset")?]);
            let orientation = Quaternion::new(t.next("vote orientation")?,
                                              t.next("vote orientation")?,
                                              t.next("vote orientation")?,
                                              t.next("vote orientation")?);
            class_votes.push(Vote {
                offset: offset,
                orientation: orientation,
                weight: weight,
            });
        }
        votes.push(class_votes);
    }

    Ok(LeafNode {
        id: id,
        depth: depth,
        parent: parent,
        background_confidence: background_confidence,
        label_probability: label_probability,
        sample_count: sample_count,
        votes: votes,
    })
}
