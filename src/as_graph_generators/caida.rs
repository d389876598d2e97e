use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;

use crate::as_graph::NetworkGraph;
use crate::shared::{Result, TopologyError, ASN};

use super::ASGraphGenerator;

/// Well-known transit networks kept alongside the CAIDA clique.
pub const TIER_2_ASNS: [ASN; 33] = [
    6939, 7713, 9002, 1764, 34549, 4766, 9304, 22652, 9318, 3292, 2497, 1273, 2516, 23947, 4134,
    4809, 4837, 3462, 5400, 7922, 1257, 12390, 2711, 8002, 14744, 38930, 33891, 41327, 7473,
    24482, 9121, 6663, 7195,
];

const CLIQUE_HEADER: &str = "# input clique:";
const IXP_HEADER: &str = "# IXP ASes:";

/// Reads a CAIDA serial-2 AS relationship file (`A|B|code[|source]`),
/// plain text or bzip2-compressed.
pub struct CaidaRelationshipLoader {
    path: PathBuf,
}

impl CaidaRelationshipLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        CaidaRelationshipLoader {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Box<dyn BufRead>> {
        let file = File::open(&self.path)?;
        let is_bz2 = self
            .path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("bz2"));
        let reader: Box<dyn Read> = if is_bz2 {
            Box::new(BzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(Box::new(BufReader::new(reader)))
    }
}

impl ASGraphGenerator for CaidaRelationshipLoader {
    fn generate(&self) -> Result<NetworkGraph> {
        let graph = load_relationships(self.open()?)?;
        log::info!(
            "{} ASes and their connections were loaded from {:?}",
            graph.len(),
            self.path
        );
        Ok(graph)
    }
}

fn parse_asn_list(text: &str) -> Vec<ASN> {
    text.split_whitespace()
        .filter_map(|field| match field.parse::<ASN>() {
            Ok(asn) => Some(asn),
            Err(_) => {
                log::warn!("Ignoring invalid ASN {:?} in header", field);
                None
            }
        })
        .collect()
}

fn parse_record(line_no: usize, fields: &[&str]) -> std::result::Result<(ASN, ASN, i32), TopologyError> {
    let invalid = |reason: String| TopologyError::InvalidRecord {
        line: line_no,
        reason,
    };
    let asn1 = fields[0]
        .trim()
        .parse::<ASN>()
        .map_err(|e| invalid(format!("first ASN {:?}: {}", fields[0], e)))?;
    let asn2 = fields[1]
        .trim()
        .parse::<ASN>()
        .map_err(|e| invalid(format!("second ASN {:?}: {}", fields[1], e)))?;
    let code = fields[2]
        .trim()
        .parse::<i32>()
        .map_err(|e| invalid(format!("relationship {:?}: {}", fields[2], e)))?;
    Ok((asn1, asn2, code))
}

/// Builds a graph from relationship records. Bad records are logged and skipped.
pub fn load_relationships<R: BufRead>(reader: R) -> Result<NetworkGraph> {
    let mut graph = NetworkGraph::new();
    graph.tier_2 = TIER_2_ASNS.to_vec();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;

        if let Some(rest) = line.strip_prefix(CLIQUE_HEADER) {
            graph.tier_1 = parse_asn_list(rest);
            continue;
        }
        if let Some(rest) = line.strip_prefix(IXP_HEADER) {
            graph.ixp = parse_asn_list(rest);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.trim_end().split('|').collect();
        if fields.len() < 3 {
            continue;
        }

        let result = parse_record(line_no, &fields)
            .and_then(|(asn1, asn2, code)| graph.add_relationship(asn1, asn2, code));
        if let Err(e) = result {
            log::warn!("Skipping line {}: {}", line_no, e);
        }
    }

    for asn in graph.tier_1.clone() {
        if let Some(node) = graph.get_mut(&asn) {
            node.tier_1 = true;
        }
    }
    for asn in graph.ixp.clone() {
        if let Some(node) = graph.get_mut(&asn) {
            node.ixp = true;
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_and_bad_records() {
        let data = "# source:topology|BGP\n\
                    # input clique: 1 2\n\
                    # IXP ASes: 9\n\
                    1|2|0|bgp\n\
                    1|3|-1|bgp\n\
                    x|3|-1|bgp\n\
                    3|4|7|bgp\n\
                    5|6\n";
        let graph = load_relationships(data.as_bytes()).unwrap();
        assert_eq!(graph.tier_1, vec![1, 2]);
        assert_eq!(graph.ixp, vec![9]);
        assert_eq!(graph.asns(), vec![1, 2, 3]);
        assert!(graph.get(&1).unwrap().tier_1);
        assert!(graph.get(&3).unwrap().providers.contains(&1));
    }
}
