use std::collections::HashSet;

use poimap_core::Coordinates;
use poimap_core::FallbackSource;
use poimap_core::PoiMapConfig;
use poimap_core::Session;
use pretty_assertions::assert_eq;

use super::RecordingMap;

const SEOUL: &str = "\
category,name,lat,lng,link
카페,Cafe Onion,37.5447,127.0560,https://place.example.com/onion
한식,Bap House,37.5700,126.9820,
카페,Ghost Cafe,,,
바,Night Bar,37.5340,126.9940,https://place.example.com/bar
";

async fn local_session() -> Session {
    let mut session = Session::new(
        PoiMapConfig::default(),
        None,
        None,
        FallbackSource::Inline(SEOUL.to_string()),
    );
    session.resolve().await;
    session
}

fn selection(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn single_category_shows_only_its_mappable_records() {
    let mut session = local_session().await;
    let mut map = RecordingMap::at_zoom(14);

    let summary = session.render(&mut map, &selection(&["카페"]));

    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(map.titles(), ["Cafe Onion"]);
    let bounds = map.bounds.expect("viewport fitted");
    assert!(bounds.contains(Coordinates {
        lat: 37.5447,
        lng: 127.0560
    }));
    // fitted at 16 then one step out
    assert_eq!(map.zoom, 15);
    // records without coordinates stay in the directory
    assert_eq!(session.directory().len(), 4);
}

#[tokio::test]
async fn rerender_replaces_the_whole_set() {
    let mut session = local_session().await;
    let mut map = RecordingMap::at_zoom(14);

    session.render(&mut map, &selection(&["카페", "한식", "바"]));
    assert_eq!(map.titles(), ["Cafe Onion", "Bap House", "Night Bar"]);

    session.render(&mut map, &selection(&["바"]));
    assert_eq!(map.titles(), ["Night Bar"]);
    assert_eq!(session.rendered().len(), 1);
}

#[tokio::test]
async fn empty_selection_clears_and_keeps_viewport() {
    let mut session = local_session().await;
    let mut map = RecordingMap::at_zoom(14);
    session.render(&mut map, &selection(&["카페"]));
    let zoom_before = map.zoom;
    let bounds_before = map.bounds;

    let summary = session.render(&mut map, &selection(&[]));

    assert_eq!(summary.created, 0);
    assert!(summary.bounds.is_none());
    assert!(map.live.is_empty());
    assert_eq!(map.zoom, zoom_before);
    assert_eq!(map.bounds, bounds_before);
}

#[tokio::test]
async fn at_most_one_overlay_is_open() {
    let mut session = local_session().await;
    let mut map = RecordingMap::at_zoom(14);
    session.render(&mut map, &selection(&["카페", "바"]));
    let handles = session.rendered().handles();
    assert_eq!(handles.len(), 2);

    assert!(session.toggle_overlay(&mut map, handles[0]));
    assert!(session.toggle_overlay(&mut map, handles[1]));
    assert_eq!(map.visible_overlays, [handles[1]]);

    assert!(!session.toggle_overlay(&mut map, handles[1]));
    assert!(map.visible_overlays.is_empty());
}

#[tokio::test]
async fn teardown_disposes_everything() {
    let mut session = local_session().await;
    let mut map = RecordingMap::at_zoom(14);
    session.render(&mut map, &selection(&["카페", "바"]));

    session.teardown(&mut map);

    assert!(map.live.is_empty());
    assert!(session.rendered().is_empty());
}
