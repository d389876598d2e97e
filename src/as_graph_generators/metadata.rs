use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::as_graph::NetworkGraph;
use crate::prefix::Prefix;
use crate::shared::{Result, ASN};

fn semicolon_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)?)
}

#[derive(Debug, Deserialize)]
struct MetadataRecord {
    asn: ASN,
    description: String,
    country: String,
    continent: String,
}

/// `asn;description;country;continent` file filling in node metadata.
pub struct MetadataLoader {
    path: PathBuf,
}

impl MetadataLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        MetadataLoader {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns how many ASes of the graph were updated.
    pub fn apply(&self, graph: &mut NetworkGraph) -> Result<usize> {
        let mut rdr = semicolon_reader(&self.path)?;
        let mut updated = 0;

        for record in rdr.deserialize::<MetadataRecord>() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Skipping metadata record: {}", e);
                    continue;
                }
            };
            let Some(node) = graph.nodes.get_mut(&record.asn) else {
                continue;
            };
            node.description = record.description;
            node.country = record.country.clone();
            node.continent = record.continent.clone();
            graph.countries.insert(record.country);
            graph.continents.insert(record.continent);
            updated += 1;
        }

        log::info!("Countries and continents loaded for {} ASes", updated);
        Ok(updated)
    }
}

#[derive(Debug, Deserialize)]
struct VantagePointRecord {
    asn: ASN,
    collector: String,
    nb_pref: u64,
    name: String,
}

/// `asn;collector;nb_pref;name` file listing route-collector peers.
pub struct VantagePointLoader {
    path: PathBuf,
}

impl VantagePointLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        VantagePointLoader {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Sets `exported_route_count` on every known VP. Returns the number of
    /// VPs found in the graph.
    pub fn apply(&self, graph: &mut NetworkGraph) -> Result<usize> {
        let mut rdr = semicolon_reader(&self.path)?;
        let mut vps: BTreeMap<ASN, (u64, String, String)> = BTreeMap::new();

        for record in rdr.deserialize::<VantagePointRecord>() {
            match record {
                Ok(r) => {
                    let entry = vps
                        .entry(r.asn)
                        .or_insert_with(|| (0, r.collector.clone(), r.name.clone()));
                    entry.0 += r.nb_pref;
                }
                Err(e) => log::warn!("Skipping vantage point record: {}", e),
            }
        }

        let mut found = 0;
        let mut missing = 0;
        for (asn, (nb_pref, collector, name)) in vps {
            match graph.nodes.get_mut(&asn) {
                Some(node) => {
                    node.set_vantage_point(nb_pref);
                    if !node.description.is_empty() {
                        node.description.push(' ');
                    }
                    node.description.push_str(&format!("({} - {})", name, collector));
                    found += 1;
                }
                None => missing += 1,
            }
        }

        if missing > 0 {
            log::warn!("{} vantage point(s) not found in the graph", missing);
        }
        log::info!("{} vantage points loaded", found);
        Ok(found)
    }
}

#[derive(Debug, Deserialize)]
struct PrependRecord {
    #[serde(rename = "AS")]
    asn: ASN,
    #[serde(rename = "Neighbor")]
    neighbor: ASN,
    #[serde(rename = "Prepend")]
    prepend: usize,
}

/// `AS;Neighbor;Prepend` file: how many extra copies of its own ASN an
/// origin adds toward each neighbor.
pub struct PrependLoader {
    path: PathBuf,
}

impl PrependLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        PrependLoader {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<BTreeMap<ASN, BTreeMap<ASN, usize>>> {
        let mut rdr = semicolon_reader(&self.path)?;
        let mut result: BTreeMap<ASN, BTreeMap<ASN, usize>> = BTreeMap::new();
        for record in rdr.deserialize::<PrependRecord>() {
            match record {
                Ok(r) => {
                    result.entry(r.asn).or_default().insert(r.neighbor, r.prepend);
                }
                Err(e) => log::warn!("Skipping prepend record: {}", e),
            }
        }
        Ok(result)
    }
}

/// Registers ROAs given as `(prefix text, authorized ASN)`. Invalid prefixes
/// are logged and skipped. Returns the number registered.
pub fn load_roas<'a>(
    graph: &mut NetworkGraph,
    roas: impl IntoIterator<Item = (&'a str, ASN)>,
) -> usize {
    let mut registered = 0;
    for (text, asn) in roas {
        match Prefix::parse(text) {
            Ok(prefix) => {
                graph.register_roa(asn, prefix);
                registered += 1;
            }
            Err(e) => log::warn!("Skipping ROA for AS{}: {}", asn, e),
        }
    }
    registered
}
