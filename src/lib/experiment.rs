//! The experiment model: libraries, replicate pools and treatment/control pairs.
//!
//! An experiment is described by two tab-separated tables. Lines starting with `#` and
//! blank lines are ignored.
//!
//! `libraries.tsv` lists one sequencing library per row:
//!
//! ```text
//! # sample   replicate  barcode    fastqbase
//! h3k4me3    1          ACGTACGT   pool1
//! h3k4me3    2          TGCATGCA   pool1
//! input      1          GGGGAAAA   pool2
//! ```
//!
//! `groups.tsv` pairs each treatment with a control and assigns the pair to a scaling group.
//! The replicate column applies to both sides; `pooled` refers to the pool of all replicates:
//!
//! ```text
//! # treatment  replicate  control  scaling_group
//! h3k4me3      1          input    h3k4
//! h3k4me3      pooled     input    h3k4
//! ```
//!
//! Libraries and pools are shared through [`Arc`] so that every normalization pair refers
//! to the single instance owned by the [`Experiment`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use log::debug;

use crate::errors::{MinuteError, Result};

/// Replicate value in `groups.tsv` that refers to a pool.
pub const POOLED: &str = "pooled";

/// File name of the library table inside a run directory.
pub const LIBRARIES_FILE: &str = "libraries.tsv";

/// File name of the scaling group table inside a run directory.
pub const GROUPS_FILE: &str = "groups.tsv";

/// One sequencing library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    name: String,
    /// Biological sample the library belongs to.
    pub sample: String,
    /// Replicate identifier, usually a number.
    pub replicate: String,
    /// Demultiplexing barcode, if any.
    pub barcode: Option<String>,
    /// Prefix of the FASTQ files this library was sequenced in.
    pub fastqbase: String,
}

impl Library {
    /// Creates a library; its name is `<sample>_rep<replicate>`.
    #[must_use]
    pub fn new(sample: &str, replicate: &str, barcode: Option<&str>, fastqbase: &str) -> Self {
        Self {
            name: format!("{sample}_rep{replicate}"),
            sample: sample.to_string(),
            replicate: replicate.to_string(),
            barcode: barcode.map(str::to_string),
            fastqbase: fastqbase.to_string(),
        }
    }

    /// The unique library name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// All replicate libraries of one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    name: String,
    /// The pooled sample.
    pub sample: String,
    /// Constituent libraries ordered by replicate.
    pub replicates: Vec<Arc<Library>>,
}

impl Pool {
    /// The pool name, `<sample>_pooled`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Either side of a normalization pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// A single library.
    Library(Arc<Library>),
    /// A pool of replicate libraries.
    Pool(Arc<Pool>),
}

impl Entity {
    /// Name of the library or pool.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Entity::Library(library) => library.name(),
            Entity::Pool(pool) => pool.name(),
        }
    }

    /// Names of the libraries this entity is made of.
    #[must_use]
    pub fn library_names(&self) -> Vec<&str> {
        match self {
            Entity::Library(library) => vec![library.name()],
            Entity::Pool(pool) => pool.replicates.iter().map(|l| l.name()).collect(),
        }
    }

    /// The sample of the library or pool.
    #[must_use]
    pub fn sample(&self) -> &str {
        match self {
            Entity::Library(library) => &library.sample,
            Entity::Pool(pool) => &pool.sample,
        }
    }
}

/// A treatment and the control it is normalized against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationPair {
    /// The treatment side.
    pub treatment: Entity,
    /// The control side.
    pub control: Entity,
}

/// Normalization pairs that share one normalization basis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingGroup {
    /// Group name from `groups.tsv`.
    pub name: String,
    /// Pairs in file order.
    pub normalization_pairs: Vec<NormalizationPair>,
}

/// Orders replicate identifiers numerically when both are numbers.
fn compare_replicates(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Reads a tab-separated table, returning each row with its 1-based line number.
///
/// Blank rows and rows whose first field starts with `#` are skipped. Quotes are literal.
fn read_tsv(path: &Path, columns: usize) -> Result<Vec<(u64, StringRecord)>> {
    let source = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .quoting(false)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| MinuteError::config(&source, e.to_string()))?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| MinuteError::config(&source, e.to_string()))?;
        let line = record.position().map_or(0, csv::Position::line);

        // Surrounding whitespace, including trailing tabs, is not part of a row.
        let fields: Vec<&str> = record.iter().collect();
        let Some(first) = fields.iter().position(|f| !f.is_empty()) else { continue };
        if fields[first].starts_with('#') {
            continue;
        }
        let last = fields.iter().rposition(|f| !f.is_empty()).unwrap_or(first);
        let fields = &fields[..=last];
        if fields.len() != columns {
            return Err(MinuteError::config(
                &source,
                format!(
                    "expected {columns} tab-separated fields but found {} on line {line} ('{}')",
                    fields.len(),
                    fields[0]
                ),
            ));
        }
        rows.push((line, StringRecord::from(fields.to_vec())));
    }
    Ok(rows)
}

/// Reads `libraries.tsv` (columns: sample, replicate, barcode, fastqbase).
///
/// # Errors
///
/// Returns [`MinuteError::Config`] if a row has the wrong number of fields, the sample
/// or replicate is empty, the replicate is the reserved word `pooled`, or two
/// rows describe the same library.
pub fn read_libraries<P: AsRef<Path>>(path: P) -> Result<Vec<Arc<Library>>> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let mut libraries: Vec<Arc<Library>> = Vec::new();
    let mut names = HashSet::new();
    let mut keys = HashSet::new();

    for (line, row) in read_tsv(path, 4)? {
        let field = |i: usize| row.get(i).unwrap_or_default();
        let (sample, replicate, barcode, fastqbase) = (field(0), field(1), field(2), field(3));

        if sample.is_empty() {
            return Err(MinuteError::config(&source, format!("library on line {line} has no sample")));
        }
        let label = if replicate.is_empty() {
            format!("library of sample '{sample}' on line {line}")
        } else {
            format!("library '{sample}_rep{replicate}' on line {line}")
        };
        if replicate.is_empty() {
            return Err(MinuteError::config(&source, format!("{label} is missing a replicate")));
        }
        if replicate == POOLED {
            return Err(MinuteError::config(
                &source,
                format!("{label} uses the reserved replicate name '{POOLED}'"),
            ));
        }

        let barcode = Some(barcode).filter(|b| !b.is_empty() && *b != "-" && *b != ".");
        let library = Library::new(sample, replicate, barcode, fastqbase);
        if !keys.insert((library.sample.clone(), library.replicate.clone()))
            || !names.insert(library.name().to_string())
        {
            return Err(MinuteError::config(&source, format!("{label} is listed more than once")));
        }
        libraries.push(Arc::new(library));
    }

    debug!("Read {} libraries from {}", libraries.len(), path.display());
    Ok(libraries)
}

/// Groups replicate libraries by sample.
///
/// A pool is emitted only for samples with more than one library. Pools appear in order of
/// the first occurrence of their sample and list their libraries ordered by replicate.
#[must_use]
pub fn group_pools(libraries: &[Arc<Library>]) -> Vec<Arc<Pool>> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_sample: HashMap<&str, Vec<Arc<Library>>> = HashMap::new();
    for library in libraries {
        let entry = by_sample.entry(library.sample.as_str()).or_default();
        if entry.is_empty() {
            order.push(&library.sample);
        }
        entry.push(Arc::clone(library));
    }

    order
        .into_iter()
        .filter_map(|sample| {
            let mut replicates = by_sample.remove(sample)?;
            if replicates.len() < 2 {
                return None;
            }
            replicates.sort_by(|a, b| compare_replicates(&a.replicate, &b.replicate));
            Some(Arc::new(Pool { name: format!("{sample}_pooled"), sample: sample.to_string(), replicates }))
        })
        .collect()
}

/// Returns the replicate identifiers of `sample`, ordered by replicate.
#[must_use]
pub fn get_replicates(libraries: &[Arc<Library>], sample: &str) -> Vec<String> {
    let mut replicates: Vec<String> =
        libraries.iter().filter(|l| l.sample == sample).map(|l| l.replicate.clone()).collect();
    replicates.sort_by(|a, b| compare_replicates(a, b));
    replicates
}

/// Builds the combined library + pool lookup by name.
fn entity_map(libraries: &[Arc<Library>], pools: &[Arc<Pool>]) -> HashMap<String, Entity> {
    let mut entities = HashMap::with_capacity(libraries.len() + pools.len());
    for library in libraries {
        entities.insert(library.name().to_string(), Entity::Library(Arc::clone(library)));
    }
    for pool in pools {
        entities.insert(pool.name().to_string(), Entity::Pool(Arc::clone(pool)));
    }
    entities
}

const TREATMENT: &str = "treatment";
const CONTROL: &str = "control";

fn entity_name(sample: &str, replicate: &str) -> String {
    if replicate == POOLED { format!("{sample}_pooled") } else { format!("{sample}_rep{replicate}") }
}

/// Reads `groups.tsv` (columns: treatment, replicate, control, scaling group).
///
/// Groups are returned in order of first occurrence with their pairs in file order. A
/// `pooled` control whose sample has a single library resolves to that library, so one
/// input library can serve pooled treatments.
///
/// # Errors
///
/// Returns [`MinuteError::Config`] naming the missing entity if a treatment or control does
/// not resolve to a library or pool (including a `pooled` treatment of a sample with a
/// single replicate), or if treatment and control are the same entity.
pub fn read_scaling_groups<P: AsRef<Path>>(
    path: P,
    libraries: &[Arc<Library>],
    pools: &[Arc<Pool>],
) -> Result<Vec<ScalingGroup>> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let entities = entity_map(libraries, pools);
    let single_library = |sample: &str| -> Option<Entity> {
        let mut of_sample = libraries.iter().filter(|l| l.sample == sample);
        match (of_sample.next(), of_sample.next()) {
            (Some(library), None) => Some(Entity::Library(Arc::clone(library))),
            _ => None,
        }
    };
    let resolve = |sample: &str, replicate: &str, role: &str, line: u64| -> Result<Entity> {
        let name = entity_name(sample, replicate);
        if let Some(entity) = entities.get(&name) {
            return Ok(entity.clone());
        }
        // the single library of a control stands in for its pool
        if replicate == POOLED && role == CONTROL {
            if let Some(library) = single_library(sample) {
                return Ok(library);
            }
        }
        let hint = if replicate == POOLED && single_library(sample).is_some() {
            " (a treatment with a single replicate is not pooled)"
        } else {
            ""
        };
        Err(MinuteError::config(
            &source,
            format!("{role} '{name}' on line {line} is not a known library or pool{hint}"),
        ))
    };

    let mut groups: Vec<ScalingGroup> = Vec::new();
    for (line, row) in read_tsv(path, 4)? {
        let field = |i: usize| row.get(i).unwrap_or_default();
        let (treatment, replicate, control, group_name) = (field(0), field(1), field(2), field(3));

        let treatment = resolve(treatment, replicate, TREATMENT, line)?;
        let control = resolve(control, replicate, CONTROL, line)?;
        if treatment.name() == control.name() {
            return Err(MinuteError::config(
                &source,
                format!("'{}' on line {line} is used as its own control", treatment.name()),
            ));
        }

        let pair = NormalizationPair { treatment, control };
        match groups.iter_mut().find(|g| g.name == group_name) {
            Some(group) => group.normalization_pairs.push(pair),
            None => groups.push(ScalingGroup {
                name: group_name.to_string(),
                normalization_pairs: vec![pair],
            }),
        }
    }
    Ok(groups)
}

/// Reads `groups.tsv` and returns all normalization pairs in file order.
///
/// # Errors
///
/// See [`read_scaling_groups`].
pub fn read_controls<P: AsRef<Path>>(
    path: P,
    libraries: &[Arc<Library>],
    pools: &[Arc<Pool>],
) -> Result<Vec<NormalizationPair>> {
    Ok(normalization_pairs(&read_scaling_groups(path, libraries, pools)?))
}

/// Flattens scaling groups into their normalization pairs.
#[must_use]
pub fn normalization_pairs(groups: &[ScalingGroup]) -> Vec<NormalizationPair> {
    groups.iter().flat_map(|g| g.normalization_pairs.iter().cloned()).collect()
}

/// Maps each FASTQ prefix to the libraries multiplexed into it, sorted by prefix.
#[must_use]
pub fn fastq_base_map(libraries: &[Arc<Library>]) -> BTreeMap<String, Vec<Arc<Library>>> {
    let mut map: BTreeMap<String, Vec<Arc<Library>>> = BTreeMap::new();
    for library in libraries {
        map.entry(library.fastqbase.clone()).or_default().push(Arc::clone(library));
    }
    map
}

/// The complete experiment: computed once per run and passed by reference.
#[derive(Debug, Clone)]
pub struct Experiment {
    /// Libraries in file order.
    pub libraries: Vec<Arc<Library>>,
    /// Pools of samples with more than one replicate.
    pub pools: Vec<Arc<Pool>>,
    /// Scaling groups in file order.
    pub scaling_groups: Vec<ScalingGroup>,
}

impl Experiment {
    /// Loads and validates the experiment description.
    ///
    /// # Errors
    ///
    /// Returns the first [`MinuteError::Config`] found in either table.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(libraries_path: P, groups_path: Q) -> Result<Self> {
        let libraries = read_libraries(libraries_path)?;
        let pools = group_pools(&libraries);
        let scaling_groups = read_scaling_groups(groups_path, &libraries, &pools)?;
        Ok(Self { libraries, pools, scaling_groups })
    }

    /// Loads `libraries.tsv` and `groups.tsv` from a run directory.
    ///
    /// # Errors
    ///
    /// Same as [`Experiment::load`].
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        Self::load(dir.join(LIBRARIES_FILE), dir.join(GROUPS_FILE))
    }

    /// Looks up a scaling group by name.
    #[must_use]
    pub fn scaling_group(&self, name: &str) -> Option<&ScalingGroup> {
        self.scaling_groups.iter().find(|g| g.name == name)
    }

    /// All normalization pairs of the experiment.
    #[must_use]
    pub fn normalization_pairs(&self) -> Vec<NormalizationPair> {
        normalization_pairs(&self.scaling_groups)
    }

    /// Renders a human-readable overview of libraries, pools and scaling groups.
    #[must_use]
    pub fn overview(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Libraries");
        for library in &self.libraries {
            let _ = writeln!(
                out,
                " - {} (sample: {}, replicate: {}, barcode: {}, fastqbase: {})",
                library.name(),
                library.sample,
                library.replicate,
                library.barcode.as_deref().unwrap_or("-"),
                library.fastqbase
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "# Pools");
        for pool in &self.pools {
            let replicates: Vec<&str> = pool.replicates.iter().map(|l| l.replicate.as_str()).collect();
            let _ = writeln!(out, " - {} (replicates: {})", pool.name(), replicates.join(", "));
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "# Scaling groups");
        for group in &self.scaling_groups {
            let _ = writeln!(out, "# Group {} - Normalization Pairs (treatment -- control)", group.name);
            for pair in &group.normalization_pairs {
                let _ = writeln!(out, " - {} -- {}", pair.treatment.name(), pair.control.name());
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "# FASTQ files");
        for (fastqbase, libraries) in fastq_base_map(&self.libraries) {
            let names: Vec<&str> = libraries.iter().map(|l| l.name()).collect();
            let _ = writeln!(out, " - {fastqbase}: {}", names.join(", "));
        }
        out
    }
}
