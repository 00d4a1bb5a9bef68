use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use geo_types::Point;
use rusqlite::{params, Connection};
use wkt::Wkt;

use super::{Error, Network, Node, Way};

/// Load a [`Network`] from a SQLite extract.
///
/// Expects a `nodes(id, geom)` table with WKT `POINT` geometries and a
/// `ways(id, node_ids, tags)` table where `node_ids` is a comma-separated
/// list of node ids in way order and `tags` is a `key=value` list joined by
/// `;`. This is deliberately the simplest schema that can exercise the
/// tripline builder end to end; a production loader reading raw OSM PBF/XML
/// is the "external collaborator" spec.md §1 puts out of scope. The
/// row-by-row WKT decoding follows the same shape as
/// `layers/road_network.rs::read_nodes`/`read_edges` in the teacher this
/// crate grew from.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Network, Error> {
    let conn = Connection::open(path)?;
    let nodes = read_nodes(&conn)?;
    let ways = read_ways(&conn)?;
    Ok(Network::new(ways, nodes))
}

fn read_nodes(conn: &Connection) -> Result<HashMap<u64, Node>, Error> {
    let mut stmt = conn.prepare("SELECT id, geom FROM nodes")?;
    let rows = stmt.query_map(params![], |row| {
        let id: i64 = row.get(0)?;
        let wkt_str: String = row.get(1)?;
        Ok((id as u64, wkt_str))
    })?;

    let mut nodes = HashMap::new();
    for row in rows {
        let (id, wkt_str) = row?;
        let wkt = Wkt::from_str(&wkt_str).map_err(|e| Error::Wkt(e.to_string()))?;
        let point: Point =
            wkt.try_into().map_err(|_| Error::Wkt(format!("node {id} geometry is not a point")))?;
        nodes.insert(id, Node { id, lon: point.x(), lat: point.y() });
    }
    Ok(nodes)
}

fn read_ways(conn: &Connection) -> Result<Vec<Way>, Error> {
    let mut stmt = conn.prepare("SELECT id, node_ids, tags FROM ways")?;
    let rows = stmt.query_map(params![], |row| {
        let id: i64 = row.get(0)?;
        let node_ids: String = row.get(1)?;
        let tags: String = row.get(2)?;
        Ok((id as u64, node_ids, tags))
    })?;

    let mut ways = Vec::new();
    for row in rows {
        let (id, node_ids, tags) = row?;
        let node_ids = node_ids
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<u64>().map_err(|_| Error::Wkt(format!("way {id} has a malformed node id"))))
            .collect::<Result<Vec<_>, _>>()?;
        let tags = parse_tags(&tags);
        ways.push(Way { id, node_ids, tags });
    }
    Ok(ways)
}

fn parse_tags(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_tag_list() {
        let tags = parse_tags("highway=residential;oneway=yes");
        assert_eq!(tags.get("highway").map(String::as_str), Some("residential"));
        assert_eq!(tags.get("oneway").map(String::as_str), Some("yes"));
    }

    #[test]
    fn empty_tag_string_has_no_tags() {
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn load_reads_nodes_and_ways_from_a_database_file() {
        let path = std::env::temp_dir().join(format!("tripline-engine-test-{}.sqlite", std::process::id()));
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE nodes (id INTEGER, geom TEXT)", params![]).unwrap();
            conn.execute("CREATE TABLE ways (id INTEGER, node_ids TEXT, tags TEXT)", params![])
                .unwrap();
            conn.execute(
                "INSERT INTO nodes (id, geom) VALUES (1, 'POINT(0 0)'), (2, 'POINT(0 0.001)')",
                params![],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO ways (id, node_ids, tags) VALUES (10, '1,2', 'highway=residential')",
                params![],
            )
            .unwrap();
        }

        let network = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(network.nodes.len(), 2);
        assert_eq!(network.ways.len(), 1);
        assert_eq!(network.ways[0].node_ids, vec![1, 2]);
        assert!(network.ways[0].is_supported_highway());
    }
}
