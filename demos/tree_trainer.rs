/// Train a single tree on synthetic images and save it.
/// Object images show a bright disk whose shading depends on the
/// rotation of the object, background images contain noise.

extern crate posehough;
extern crate clap;
#[macro_use]
extern crate log;
extern crate env_logger;
extern crate image;
extern crate rand;
#[macro_use]
extern crate error_chain;

use posehough::hough::{TreeConfig, TreeTrainer};
use posehough::linalg::Vec3;
use posehough::quaternion::Quaternion;
use posehough::types::{Channel, Channel16, ImagePatch};
use clap::{Arg, App};
use image::{GrayImage, Luma};
use rand::{Rng, SeedableRng, StdRng};
use std::f64::consts::PI;
use std::str::FromStr;
use std::sync::Arc;

error_chain!{
    links {
        Tree(posehough::errors::Error, posehough::errors::ErrorKind);
    }
    foreign_links {
        Int(std::num::ParseIntError);
    }
}

pub fn main() {
    use std::process::exit;
    if let Err(e) = main_() {
        eprintln!("Error: {}", e);
        for cause in e.iter().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        exit(-1);
    }
}

macro_rules! MAXDEPTH_DEFAULT {() => (10usize) }
macro_rules! ITERATIONS_DEFAULT { () => (500usize) }
macro_rules! STOPSIZE_DEFAULT { () => (20usize) }
macro_rules! IMAGES_DEFAULT { () => (20usize) }
macro_rules! PATCHES_DEFAULT { () => (50usize) }
macro_rules! SEED_DEFAULT { () => (1usize) }

const IMAGE_SIZE: u32 = 64;
const DISK_RADIUS: f64 = 14.0;

/// Gray values and a height map of an image.
/// The disk center and orientation are None for a background image.
fn synthetic_image<R: Rng>(rng: &mut R, object: Option<([f64; 2], f64)>) -> Arc<Vec<Channel>> {
    let noise: Vec<u8> = (0..IMAGE_SIZE * IMAGE_SIZE).map(|_| rng.gen_range(0, 40)).collect();
    let gray = GrayImage::from_fn(IMAGE_SIZE, IMAGE_SIZE, |x, y| {
        let n = noise[(y * IMAGE_SIZE + x) as usize];
        match object {
            Some((c, angle)) => {
                let dx = x as f64 - c[0];
                let dy = y as f64 - c[1];
                if dx * dx + dy * dy <= DISK_RADIUS * DISK_RADIUS {
                    // shading along the rotated x axis
                    let t = (dx * angle.cos() + dy * angle.sin()) / DISK_RADIUS;
                    Luma([(150.0 + 60.0 * t) as u8 + n / 4])
                } else {
                    Luma([n])
                }
            }
            None => Luma([n]),
        }
    });
    let height = Channel16::from_fn(IMAGE_SIZE, IMAGE_SIZE, |x, y| {
        let h = match object {
            Some((c, _)) => {
                let dx = x as f64 - c[0];
                let dy = y as f64 - c[1];
                let r2 = DISK_RADIUS * DISK_RADIUS - dx * dx - dy * dy;
                if r2 > 0.0 { 1000.0 + 20.0 * r2.sqrt() } else { 1000.0 }
            }
            None => 1000.0,
        };
        Luma([h as u16])
    });
    Arc::new(vec![Channel::Narrow(gray), Channel::Wide(height)])
}

/// Patches of `images` synthetic images of one label
fn patches<R: Rng>(rng: &mut R, images: usize, per_image: usize, object: bool) -> Vec<ImagePatch> {
    let mut res = Vec::with_capacity(images * per_image);
    for _ in 0..images {
        let truth = if object {
            let c = [rng.gen_range(20.0, 44.0), rng.gen_range(20.0, 44.0)];
            Some((c, rng.gen_range(-PI, PI)))
        } else {
            None
        };
        let channels = synthetic_image(rng, truth);
        let orientation = truth.map(|(_, a)| Quaternion::from_axis_angle([0.0, 0.0, 1.0], a))
            .unwrap_or_default();
        for _ in 0..per_image {
            let loc = match truth {
                // patches of an object lie on the disk
                Some((c, _)) => {
                    let r = rng.gen_range(0.0, DISK_RADIUS);
                    let phi = rng.gen_range(-PI, PI);
                    [(c[0] + r * phi.cos()) as i32, (c[1] + r * phi.sin()) as i32]
                }
                None => [rng.gen_range(0, IMAGE_SIZE as i32), rng.gen_range(0, IMAGE_SIZE as i32)],
            };
            let offset = match truth {
                Some((c, _)) => Vec3([c[0] as f32 - loc[0] as f32, c[1] as f32 - loc[1] as f32, 0.0]),
                None => Vec3([0.0; 3]),
            };
            if let Some(p) = ImagePatch::new(channels.clone(), loc, 1.0, offset, orientation) {
                res.push(p);
            }
        }
    }
    res
}

pub fn main_() -> Result<()> {
    env_logger::init();
    let args = App::new("Single tree learner")
        .arg(Arg::with_name("out_filename")
            .short("o")
            .long("out")
            .takes_value(true)
            .required(true)
            .help("Filename for trained tree"))
        .arg(Arg::with_name("maxdepth")
            .long("maxdepth")
            .takes_value(true)
            .help(concat!("Max depth a tree may be grown - Default ", MAXDEPTH_DEFAULT!())))
        .arg(Arg::with_name("iterations")
            .long("iterations")
            .takes_value(true)
            .help(concat!("Number of random tests generated for each node - Default ",
                          ITERATIONS_DEFAULT!())))
        .arg(Arg::with_name("stopsize")
            .long("stopsize")
            .takes_value(true)
            .help(concat!("Max size of splitted subset to stop growing - Default ", STOPSIZE_DEFAULT!())))
        .arg(Arg::with_name("images")
            .long("images")
            .takes_value(true)
            .help(concat!("Number of synthetic images per label - Default ", IMAGES_DEFAULT!())))
        .arg(Arg::with_name("patches")
            .long("patches")
            .takes_value(true)
            .help(concat!("Number of patches per image - Default ", PATCHES_DEFAULT!())))
        .arg(Arg::with_name("seed")
            .long("seed")
            .takes_value(true)
            .help(concat!("Seed of the random generator - Default ", SEED_DEFAULT!())))
        .get_matches();

    let filename = args.value_of("out_filename").ok_or("No valid output filename")?;
    let parse = |name: &str, default: usize| -> Result<usize> {
        match args.value_of(name) {
            Some(x) => Ok(usize::from_str(x)?),
            None => Ok(default),
        }
    };
    let maxdepth = parse("maxdepth", MAXDEPTH_DEFAULT!())?;
    let iterations = parse("iterations", ITERATIONS_DEFAULT!())?;
    let stopsize = parse("stopsize", STOPSIZE_DEFAULT!())?;
    let images = parse("images", IMAGES_DEFAULT!())?;
    let per_image = parse("patches", PATCHES_DEFAULT!())?;
    let seed = parse("seed", SEED_DEFAULT!())?;

    info!("Creating synthetic images");
    let seed_slice: &[usize] = &[seed];
    let mut rng = StdRng::from_seed(seed_slice);
    let pool = vec![patches(&mut rng, images, per_image, false),
                    patches(&mut rng, images, per_image, true)];

    // the synthetic patches carry no relative poses
    let config = TreeConfig::new(maxdepth, stopsize, iterations, [40, 40])
        .ok_or("Bad parameter for growing a tree")?
        .with_pose_measure(false);
    let param_filename = format!("{}_param.json", filename);
    config.save(&param_filename)?;

    info!("Starting Learning");
    let tree = TreeTrainer::with_seed(config, 1.0, vec![0, 1], seed.wrapping_add(1))?
        .train(&pool)?;
    info!("Learned sucessfull");
    tree.save(filename)?;

    let object_leaves = tree.leaves.iter().filter(|l| l.label_probability[1] > 0.9).count();
    info!("{} of {} leaves are nearly pure object leaves",
          object_leaves,
          tree.num_leaves());
    Ok(())
}
