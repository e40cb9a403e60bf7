//! Persistence-level walk-throughs of the discovery scenarios that do not
//! need a live browser: canonical dedup collapsing tracking variants into
//! one page (with merged edges), and sitemap-seeded pages persisting with
//! no incoming links.

use sitescout::fetcher::PageKind;
use sitescout::links::{LinkLocation, PageLink, RevealedBy};
use sitescout::crawl::{DiscoveredPage, PageEdge};
use sitescout::store::GraphStore;
use sitescout::urlnorm::canonicalize;
use tempfile::TempDir;

fn page(url: &str, depth: u8) -> DiscoveredPage {
    DiscoveredPage {
        url: url.to_string(),
        title: format!("Page {url}"),
        kind: PageKind::Content,
        requires_auth: false,
        depth,
        accessible: true,
        thumbnail: None,
    }
}

fn link(url: &str) -> PageLink {
    PageLink {
        url: url.to_string(),
        text: "link".into(),
        location: LinkLocation::Content,
        menu_level: 0,
        revealed_by: RevealedBy::None,
        parent_menu_text: None,
    }
}

#[tokio::test]
async fn tracking_variants_collapse_to_one_page_and_one_edge() {
    let dir = TempDir::new().expect("tempdir");
    let store = GraphStore::open(&dir.path().join("g.sqlite"))
        .await
        .expect("store");

    let root = canonicalize("https://example.com/");
    // Two raw spellings of the same target page.
    let variant_a = canonicalize("https://example.com/p?utm_source=x&id=7");
    let variant_b = canonicalize("https://example.com/p?id=7&fbclid=abc");
    assert_eq!(variant_a, variant_b);

    let pages = vec![page(&root, 0), page(&variant_a, 1)];
    let edges: Vec<PageEdge> = [variant_a.as_str(), variant_b.as_str()]
        .into_iter()
        .filter_map(|target| PageEdge::from_link(&root, &link(target)))
        .collect();

    let stats = store.persist_crawl("proj", &pages, &edges).await.expect("persist");
    assert_eq!(stats.pages_created, 2);

    let graph = store.graph("proj").await.expect("graph");
    assert_eq!(graph.nodes.len(), 2);
    // Both raw edges landed on the same endpoint pair: one row.
    assert_eq!(graph.edges.len(), 1);
}

#[tokio::test]
async fn sitemap_pages_persist_without_incoming_edges() {
    let dir = TempDir::new().expect("tempdir");
    let store = GraphStore::open(&dir.path().join("g.sqlite"))
        .await
        .expect("store");

    let root = canonicalize("https://example.com/");
    let s1 = canonicalize("https://example.com/s1");
    let s2 = canonicalize("https://example.com/s2");

    // The crawl saw root -> s1; s2 only arrived via the sitemap.
    let pages = vec![page(&root, 0), page(&s1, 1), page(&s2, 1)];
    let edges = vec![PageEdge::from_link(&root, &link(&s1)).expect("edge")];

    store.persist_crawl("proj", &pages, &edges).await.expect("persist");

    let graph = store.graph("proj").await.expect("graph");
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 1);

    let s2_node = graph
        .nodes
        .iter()
        .find(|n| n.url == s2)
        .expect("s2 persisted");
    let incoming = graph
        .edges
        .iter()
        .filter(|e| e.target_page_id == s2_node.id)
        .count();
    assert_eq!(incoming, 0);
}

#[tokio::test]
async fn re_discovery_updates_rather_than_duplicates() {
    let dir = TempDir::new().expect("tempdir");
    let store = GraphStore::open(&dir.path().join("g.sqlite"))
        .await
        .expect("store");

    let root = canonicalize("https://example.com/");
    let child = canonicalize("https://example.com/about");

    let edges = vec![PageEdge::from_link(&root, &link(&child)).expect("edge")];
    store
        .persist_crawl("proj", &[page(&root, 0), page(&child, 1)], &edges)
        .await
        .expect("first persist");

    // Second run finds the same structure with a refreshed title.
    let mut updated_child = page(&child, 1);
    updated_child.title = "About Us (new)".to_string();
    store
        .persist_crawl("proj", &[page(&root, 0), updated_child], &edges)
        .await
        .expect("second persist");

    assert_eq!(store.page_count("proj").await.expect("count"), 2);
    assert_eq!(store.edge_count("proj").await.expect("count"), 1);

    let graph = store.graph("proj").await.expect("graph");
    let child_node = graph.nodes.iter().find(|n| n.url == child).expect("child");
    assert_eq!(child_node.title, "About Us (new)");
}
