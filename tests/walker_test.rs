//! Tree walker behaviour against an in-memory Graph.

mod common;

use common::{client, config, file, folder, stale_metadata_tree, FakeGraph, Listing};
use drive_sweep::TreeWalker;

fn ids(nodes: &[drive_sweep::Node]) -> Vec<(&str, u32)> {
    nodes.iter().map(|n| (n.id.as_str(), n.depth)).collect()
}

mod classification {
    use super::*;

    #[tokio::test]
    async fn trusts_child_count_over_enumeration() {
        let graph = stale_metadata_tree().shared();
        let config = config(false);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let outcome = walker.walk("drv", "root").await;

        assert_eq!(ids(&outcome.matches), vec![("A", 0), ("C", 1)]);
        assert_eq!(outcome.folders.len(), 4);
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn top_level_protection_excludes_depth_zero() {
        let graph = stale_metadata_tree().shared();
        let config = config(true);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let outcome = walker.walk("drv", "root").await;

        assert_eq!(ids(&outcome.matches), vec![("C", 1)]);
        // Protected folders are still counted as folders.
        assert_eq!(outcome.folders.len(), 4);
    }

    #[tokio::test]
    async fn files_are_ignored() {
        let graph = FakeGraph::new()
            .children(
                "root",
                vec![file("f1", "notes.txt", "root"), folder("E", "E", 0, "root")],
            )
            .shared();
        let config = config(false);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let outcome = walker.walk("drv", "root").await;

        assert_eq!(ids(&outcome.folders), vec![("E", 0)]);
        assert_eq!(ids(&outcome.matches), vec![("E", 0)]);
    }

    #[tokio::test]
    async fn empty_folders_are_not_listed() {
        let graph = stale_metadata_tree().shared();
        let config = config(false);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        walker.walk("drv", "root").await;

        let listed: Vec<String> = graph.log().into_iter().map(|(_, url)| url).collect();
        assert_eq!(listed.len(), 3); // root, B, D
        assert!(listed.iter().all(|url| !url.contains("/items/A/") && !url.contains("/items/C/")));
        assert!(listed[0].contains("$select=id,name,folder,parentReference,size"));
        assert!(listed[0].contains("$top=100"));
    }
}

mod depth {
    use super::*;

    #[tokio::test]
    async fn depth_counts_folder_ancestors() {
        let graph = FakeGraph::new()
            .children("root", vec![folder("L0", "L0", 1, "root")])
            .children("L0", vec![folder("L1", "L1", 2, "L0")])
            .children(
                "L1",
                vec![folder("L2a", "L2a", 0, "L1"), folder("L2b", "L2b", 1, "L1")],
            )
            .children("L2b", vec![folder("L3", "L3", 0, "L2b")])
            .shared();
        let config = config(true);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let outcome = walker.walk("drv", "root").await;

        assert_eq!(ids(&outcome.matches), vec![("L2a", 2), ("L3", 3)]);
        for m in &outcome.matches {
            let mut ancestors = 0;
            let mut parent = m.parent_id.clone();
            while parent != "root" {
                ancestors += 1;
                parent = outcome
                    .folders
                    .iter()
                    .find(|f| f.id == parent)
                    .map(|f| f.parent_id.clone())
                    .unwrap();
            }
            assert_eq!(m.depth, ancestors);
        }
    }

    #[tokio::test]
    async fn deep_trees_do_not_recurse() {
        let depth = 2_000;
        let mut graph = FakeGraph::new();
        for level in 0..depth {
            let parent = if level == 0 { "root".to_string() } else { format!("n{}", level - 1) };
            let id = format!("n{}", level);
            let child_count = if level + 1 == depth { 0 } else { 1 };
            graph = graph.children(&parent, vec![folder(&id, &id, child_count, &parent)]);
        }
        let graph = graph.shared();
        let config = config(true);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let outcome = walker.walk("drv", "root").await;

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].depth, (depth - 1) as u32);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn failed_listing_truncates_only_its_subtree() {
        let graph = FakeGraph::new()
            .children(
                "root",
                vec![
                    folder("X", "X", 3, "root"),
                    folder("Y", "Y", 1, "root"),
                ],
            )
            .listing("X", Listing::Status(503))
            .children("Y", vec![folder("Y1", "Y1", 0, "Y")])
            .shared();
        let config = config(true);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let outcome = walker.walk("drv", "root").await;

        assert_eq!(outcome.truncated, vec!["X".to_string()]);
        assert_eq!(ids(&outcome.matches), vec![("Y1", 1)]);
        assert!(!outcome.is_complete());
    }

    #[tokio::test]
    async fn failed_root_listing_returns_nothing() {
        let graph = FakeGraph::new().listing("root", Listing::Status(403)).shared();
        let config = config(true);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let outcome = walker.walk("drv", "root").await;

        assert!(outcome.folders.is_empty());
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.truncated, vec!["root".to_string()]);
    }

    #[tokio::test]
    async fn failure_on_later_page_keeps_earlier_pages() {
        let graph = FakeGraph::new()
            .children("root", vec![folder("P", "P", 3, "root")])
            .listing(
                "P",
                Listing::FailsAfter {
                    pages: vec![vec![folder("P1", "P1", 0, "P"), folder("P2", "P2", 1, "P")]],
                    status: 500,
                },
            )
            .children("P2", vec![folder("P2a", "P2a", 0, "P2")])
            .shared();
        let config = config(true);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let outcome = walker.walk("drv", "root").await;

        assert_eq!(ids(&outcome.matches), vec![("P1", 1), ("P2a", 2)]);
        assert_eq!(outcome.truncated, vec!["P".to_string()]);
        assert_eq!(outcome.folders.len(), 4);
    }
}

mod pagination {
    use super::*;

    #[tokio::test]
    async fn follows_next_link_across_pages() {
        let graph = FakeGraph::new()
            .listing(
                "root",
                Listing::Pages(vec![
                    vec![folder("A", "A", 1, "root")],
                    vec![folder("B", "B", 0, "root"), folder("C", "C", 1, "root")],
                ]),
            )
            .children("A", vec![folder("A1", "A1", 0, "A")])
            .children("C", vec![folder("C1", "C1", 0, "C")])
            .shared();
        let config = config(true);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let outcome = walker.walk("drv", "root").await;

        assert_eq!(ids(&outcome.matches), vec![("A1", 1), ("C1", 1)]);
        assert_eq!(outcome.folders.len(), 5);
        let log = graph.log();
        assert!(log[1].1.contains("page=1"));
    }

    #[tokio::test]
    async fn item_repeated_across_pages_is_counted_once() {
        let graph = FakeGraph::new()
            .listing(
                "root",
                Listing::Pages(vec![
                    vec![folder("A", "A", 1, "root"), folder("B", "B", 0, "root")],
                    vec![folder("B", "B", 0, "root"), folder("A", "A", 1, "root")],
                ]),
            )
            .children("A", vec![folder("A1", "A1", 0, "A")])
            .shared();
        let config = config(false);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let outcome = walker.walk("drv", "root").await;

        assert_eq!(ids(&outcome.matches), vec![("B", 0), ("A1", 1)]);
        assert_eq!(outcome.folders.len(), 3);
        let listings_of_a = graph.log().iter().filter(|(_, url)| url.contains("/items/A/")).count();
        assert_eq!(listings_of_a, 1);
    }

    #[tokio::test]
    async fn rescanning_unchanged_tree_is_identical() {
        let graph = stale_metadata_tree().shared();
        let config = config(false);
        let client = client(&graph, &config);
        let walker = TreeWalker::new(&client, config.base(), &config.walk);

        let first = walker.walk("drv", "root").await;
        let second = walker.walk("drv", "root").await;

        assert_eq!(first, second);
    }
}
