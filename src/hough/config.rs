//! Parameters for growing a tree

use serde_json;
use std::io::{Read, Write};
use std::path::Path;

use errors::*;
use hough::treefile::{create, open};

/// Parameters used while growing a tree.
/// They are stored as JSON next to a trained tree.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TreeConfig {
    /// The maximum depth a tree may have.
    pub max_depth: usize,
    /// A child with at most this many samples becomes a leaf.
    pub min_samples: usize,
    /// The number of random tests generated for every search of a node.
    pub iterations: usize,
    /// Use the orientation of the samples to rate a split.
    pub pose_measure: bool,
    /// Rate the spread of the offsets around the mean of every class
    /// instead of around the mean of all foreground samples.
    pub class_specific_location: bool,
    /// Width and height of the window test points are drawn from
    /// (relative to the patch center at scale 1).
    pub offset_window: [u32; 2],
    /// Number of surfel feature components a test may select
    /// in addition to the appearance channels.
    pub surfel_dims: usize,
}

impl Default for TreeConfig {
    fn default() -> TreeConfig {
        TreeConfig {
            max_depth: 15,
            min_samples: 20,
            iterations: 2000,
            pose_measure: true,
            class_specific_location: true,
            offset_window: [80, 80],
            surfel_dims: 0,
        }
    }
}

impl TreeConfig {
    /// Creates a configuration.
    /// Returns None if invalid parameters are used.
    /// # Parameters
    /// - `max_depth` - maximum depth of a tree
    /// - `min_samples` - children with at most this many samples become leaves
    /// - `iterations` - number of random tests per search, has to be positive
    /// - `offset_window` - window of the test points
    pub fn new(max_depth: usize,
               min_samples: usize,
               iterations: usize,
               offset_window: [u32; 2])
               -> Option<TreeConfig> {
        let config = TreeConfig {
            max_depth: max_depth,
            min_samples: min_samples,
            iterations: iterations,
            offset_window: offset_window,
            ..TreeConfig::default()
        };
        if config.validate().is_err() {
            return None;
        }
        Some(config)
    }

    pub fn with_pose_measure(self, pose_measure: bool) -> TreeConfig {
        TreeConfig { pose_measure: pose_measure, ..self }
    }

    pub fn with_class_specific_location(self, class_specific: bool) -> TreeConfig {
        TreeConfig { class_specific_location: class_specific, ..self }
    }

    pub fn with_surfel_dims(self, surfel_dims: usize) -> TreeConfig {
        TreeConfig { surfel_dims: surfel_dims, ..self }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            bail!(ErrorKind::InvalidConfig("max_depth has to be positive".to_string()));
        }
        if self.iterations == 0 {
            bail!(ErrorKind::InvalidConfig("iterations has to be positive".to_string()));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and validates a configuration
    pub fn from_json(json: &str) -> Result<TreeConfig> {
        let config: TreeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<TreeConfig> {
        let path = path.as_ref();
        let mut json = String::new();
        open(path, "config")?.read_to_string(&mut json)?;
        TreeConfig::from_json(&json).chain_err(|| format!("invalid config file {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let mut writer = create(path, "config")?;
        writer.write_all(json.as_bytes())
            .and_then(|_| writer.flush())
            .chain_err(|| format!("could not write config file {}", path.display()))
    }
}
