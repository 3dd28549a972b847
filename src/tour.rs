//! Tour Graph Builder: hotspot list in, viewer-ready node graph out.
//!
//! Every node links to every other node (complete directed graph, n·(n−1)
//! links), so each room is one hop from any other; the panorama viewer owns
//! traversal and rendering from there. Link positions carry the target's
//! floor-plan coordinates verbatim so the viewer can place markers. O(n²)
//! is fine at the tens of hotspots a project realistically holds.
//!
//! Panorama sources are rewritten onto this service's `/api/image` proxy so
//! the viewer fetches same-origin instead of hitting the storage provider.

use serde::{Deserialize, Serialize};

use crate::models::Hotspot;

/// Marker placement hint inside the target panorama, in the viewer's
/// texture-coordinate fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LinkPosition {
    #[serde(rename = "textureX")]
    pub texture_x: f64,
    #[serde(rename = "textureY")]
    pub texture_y: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TourLink {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    pub position: LinkPosition,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TourNode {
    pub id: String,
    pub panorama: String,
    pub links: Vec<TourLink>,
}

/// Build the complete navigation graph for a finalized hotspot list.
///
/// A hotspot with no attached image still produces a node with an empty
/// panorama source; handling a broken source is the viewer's concern. Zero
/// hotspots yield an empty node list.
pub fn build_nodes(hotspots: &[Hotspot], public_url: &str, storage_domain: &str) -> Vec<TourNode> {
    hotspots
        .iter()
        .enumerate()
        .map(|(index, hotspot)| TourNode {
            id: hotspot.id.clone(),
            panorama: proxy_source(&hotspot.url, public_url, storage_domain),
            links: hotspots
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, target)| TourLink {
                    node_id: target.id.clone(),
                    position: LinkPosition {
                        texture_x: target.x,
                        texture_y: target.y,
                    },
                })
                .collect(),
        })
        .collect()
}

/// Rewrite an image reference onto the same-origin proxy path. The storage
/// domain is stripped when present; other references keep their path as-is.
fn proxy_source(image_ref: &str, public_url: &str, storage_domain: &str) -> String {
    if image_ref.is_empty() {
        return String::new();
    }
    let path = match image_ref.split_once(storage_domain) {
        Some((_, rest)) => rest,
        None => image_ref,
    };
    let path = path.trim_start_matches('/');
    format!("{}/api/image/{path}", public_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn hotspot(id: &str, x: f64, y: f64, url: &str) -> Hotspot {
        let now = Utc::now();
        Hotspot {
            id: id.to_string(),
            project_id: "p1".to_string(),
            x,
            y,
            label: format!("Room {id}"),
            url: url.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    const PUBLIC: &str = "https://tours.example.com";
    const DOMAIN: &str = "pub.r2.dev";

    #[test]
    fn empty_list_builds_an_empty_graph() {
        assert!(build_nodes(&[], PUBLIC, DOMAIN).is_empty());
    }

    #[test]
    fn n_nodes_carry_n_times_n_minus_one_links() {
        for n in 1..=6 {
            let hotspots: Vec<Hotspot> = (0..n)
                .map(|i| hotspot(&i.to_string(), i as f64, i as f64, "https://pub.r2.dev/u/p.jpg"))
                .collect();
            let nodes = build_nodes(&hotspots, PUBLIC, DOMAIN);
            assert_eq!(nodes.len(), n);
            let total_links: usize = nodes.iter().map(|node| node.links.len()).sum();
            assert_eq!(total_links, n * (n - 1));
        }
    }

    #[test]
    fn no_node_links_to_itself() {
        let hotspots = vec![
            hotspot("a", 1.0, 2.0, ""),
            hotspot("b", 3.0, 4.0, ""),
            hotspot("c", 5.0, 6.0, ""),
        ];
        for node in build_nodes(&hotspots, PUBLIC, DOMAIN) {
            assert!(node.links.iter().all(|link| link.node_id != node.id));
        }
    }

    #[test]
    fn link_positions_preserve_target_coordinates() {
        let hotspots = vec![
            hotspot("a", 12.5, 99.875, ""),
            hotspot("b", 0.0, 100.0, ""),
        ];
        let nodes = build_nodes(&hotspots, PUBLIC, DOMAIN);

        let link_to_b = &nodes[0].links[0];
        assert_eq!(link_to_b.node_id, "b");
        assert_eq!(
            link_to_b.position,
            LinkPosition {
                texture_x: 0.0,
                texture_y: 100.0
            }
        );

        let link_to_a = &nodes[1].links[0];
        assert_eq!(link_to_a.node_id, "a");
        assert_eq!(link_to_a.position.texture_x, 12.5);
        assert_eq!(link_to_a.position.texture_y, 99.875);
    }

    #[test]
    fn panorama_sources_are_rewritten_through_the_proxy() {
        let hotspots = vec![hotspot(
            "a",
            1.0,
            1.0,
            "https://pub.r2.dev/user_1/pano.jpg",
        )];
        let nodes = build_nodes(&hotspots, PUBLIC, DOMAIN);
        assert_eq!(
            nodes[0].panorama,
            "https://tours.example.com/api/image/user_1/pano.jpg"
        );
    }

    #[test]
    fn imageless_hotspot_still_yields_a_node() {
        let hotspots = vec![hotspot("a", 1.0, 1.0, ""), hotspot("b", 2.0, 2.0, "x/y.jpg")];
        let nodes = build_nodes(&hotspots, PUBLIC, DOMAIN);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].panorama, "");
        assert_eq!(nodes[1].panorama, "https://tours.example.com/api/image/x/y.jpg");
    }

    #[test]
    fn serialized_links_use_viewer_field_names() {
        let hotspots = vec![hotspot("a", 1.0, 2.0, ""), hotspot("b", 3.0, 4.0, "")];
        let nodes = build_nodes(&hotspots, PUBLIC, DOMAIN);
        let value = serde_json::to_value(&nodes[0]).unwrap();
        assert_eq!(value["links"][0]["nodeId"], "b");
        assert_eq!(value["links"][0]["position"]["textureX"], 3.0);
        assert_eq!(value["links"][0]["position"]["textureY"], 4.0);
    }
}
