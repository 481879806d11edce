#![allow(clippy::float_cmp)]

use super::*;
use crate::palette::PaletteColor;

fn record_at(top: f64, left: f64) -> BoxRecord {
    BoxRecord::new(Position::new(top, left), PaletteColor::Pine)
}

fn positions(projection: &Projection) -> Vec<Position> {
    projection.boxes().iter().map(|b| b.position).collect()
}

// =============================================================
// Construction
// =============================================================

#[test]
fn new_over_empty_doc_has_empty_view() {
    let projection = Projection::new(CanvasDoc::genesis().unwrap());
    assert!(projection.boxes().is_empty());
    assert!(projection.is_empty());
    assert_eq!(projection.revision(), 0);
}

#[test]
fn new_over_populated_doc_builds_view() {
    let mut doc = CanvasDoc::genesis().unwrap();
    doc.push(record_at(1.0, 2.0)).unwrap();
    doc.push(record_at(3.0, 4.0)).unwrap();

    let projection = Projection::new(doc);
    assert_eq!(positions(&projection), vec![Position::new(1.0, 2.0), Position::new(3.0, 4.0)]);
    assert_eq!(projection.revision(), 1);
}

// =============================================================
// Local writes
// =============================================================

#[test]
fn push_appends_to_view() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    assert_eq!(projection.push(record_at(0.0, 0.0)).unwrap(), 0);
    assert_eq!(projection.push(record_at(1.0, 1.0)).unwrap(), 1);

    assert_eq!(projection.boxes().len(), 2);
    assert_eq!(projection.len(), 2);
    assert_eq!(projection.revision(), 2);
}

#[test]
fn set_position_patches_only_that_entry() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    projection.push(record_at(0.0, 0.0)).unwrap();
    projection.push(record_at(10.0, 10.0)).unwrap();

    projection.set_position(1, Position::new(20.0, 30.0)).unwrap();
    assert_eq!(positions(&projection), vec![Position::new(0.0, 0.0), Position::new(20.0, 30.0)]);
}

#[test]
fn set_size_updates_view() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    projection.push(record_at(0.0, 0.0)).unwrap();
    projection.set_size(0, Size::new(70.0, 90.0)).unwrap();
    assert_eq!(projection.boxes()[0].size, Size::new(70.0, 90.0));
}

#[test]
fn writing_an_identical_value_does_not_bump_revision() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    projection.push(record_at(5.0, 5.0)).unwrap();
    let before = projection.revision();

    projection.set_position(0, Position::new(5.0, 5.0)).unwrap();
    assert_eq!(projection.revision(), before);
}

#[test]
fn delete_shifts_view() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    projection.push(record_at(0.0, 0.0)).unwrap();
    projection.push(record_at(1.0, 1.0)).unwrap();
    projection.push(record_at(2.0, 2.0)).unwrap();

    projection.delete(1).unwrap();
    assert_eq!(positions(&projection), vec![Position::new(0.0, 0.0), Position::new(2.0, 2.0)]);
}

#[test]
fn failed_write_leaves_view_and_revision_alone() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    projection.push(record_at(0.0, 0.0)).unwrap();
    let before = projection.revision();

    assert!(projection.set_position(4, Position::new(1.0, 1.0)).is_err());
    assert!(projection.delete(4).is_err());
    assert_eq!(projection.revision(), before);
    assert_eq!(projection.boxes().len(), 1);
}

#[test]
fn refresh_without_pending_changes_is_noop() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    assert!(!projection.refresh());
}

#[test]
fn writes_through_doc_mut_appear_after_refresh() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    projection.doc_mut().push(record_at(7.0, 7.0)).unwrap();
    assert!(projection.boxes().is_empty());

    assert!(projection.refresh());
    assert_eq!(positions(&projection), vec![Position::new(7.0, 7.0)]);
}

#[test]
fn queued_insert_then_delete_settles_on_document_state() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    projection.push(record_at(0.0, 0.0)).unwrap();

    projection.doc_mut().push(record_at(1.0, 1.0)).unwrap();
    projection.doc_mut().delete(0).unwrap();
    projection.refresh();

    assert_eq!(positions(&projection), vec![Position::new(1.0, 1.0)]);
}

// =============================================================
// Remote changes
// =============================================================

#[test]
fn merge_brings_in_remote_inserts() {
    let mut local = Projection::new(CanvasDoc::genesis().unwrap());
    let mut remote = local.doc_mut().fork();

    remote.push(record_at(4.0, 4.0)).unwrap();
    local.merge(&mut remote).unwrap();

    assert_eq!(positions(&local), vec![Position::new(4.0, 4.0)]);
}

#[test]
fn merge_reflects_remote_field_update() {
    let mut local = Projection::new(CanvasDoc::genesis().unwrap());
    local.push(record_at(0.0, 0.0)).unwrap();
    local.push(record_at(1.0, 1.0)).unwrap();
    let mut remote = local.doc_mut().fork();

    remote.set_size(1, Size::new(222.0, 111.0)).unwrap();
    local.merge(&mut remote).unwrap();

    assert_eq!(local.boxes()[0], record_at(0.0, 0.0));
    assert_eq!(local.boxes()[1].size, Size::new(222.0, 111.0));
}

#[test]
fn merge_reflects_remote_delete() {
    let mut local = Projection::new(CanvasDoc::genesis().unwrap());
    local.push(record_at(0.0, 0.0)).unwrap();
    local.push(record_at(1.0, 1.0)).unwrap();
    let mut remote = local.doc_mut().fork();

    remote.delete(0).unwrap();
    local.merge(&mut remote).unwrap();

    assert_eq!(positions(&local), vec![Position::new(1.0, 1.0)]);
}

#[test]
fn merge_with_nothing_new_keeps_revision() {
    let mut local = Projection::new(CanvasDoc::genesis().unwrap());
    local.push(record_at(0.0, 0.0)).unwrap();
    let mut remote = local.doc_mut().fork();
    let before = local.revision();

    local.merge(&mut remote).unwrap();
    assert_eq!(local.revision(), before);
}

#[test]
fn relayed_update_refreshes_view() {
    let mut local = Projection::new(CanvasDoc::genesis().unwrap());
    let mut remote = Projection::new(local.doc_mut().fork());

    remote.push(record_at(8.0, 9.0)).unwrap();
    let update = remote.encode_update();
    local.apply_update(&update).unwrap();

    assert_eq!(positions(&local), vec![Position::new(8.0, 9.0)]);
}

#[test]
fn fresh_reads_see_document_not_cache() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    projection.push(record_at(0.0, 0.0)).unwrap();
    projection.doc_mut().set_position(0, Position::new(3.0, 3.0)).unwrap();

    // View is stale until refresh; the fresh read is not.
    assert_eq!(projection.boxes()[0].position, Position::new(0.0, 0.0));
    assert_eq!(projection.position(0).unwrap(), Position::new(3.0, 3.0));
    assert_eq!(projection.get(0).unwrap().position, Position::new(3.0, 3.0));
}

#[test]
fn malformed_remote_box_truncates_view_at_its_index() {
    let mut local = Projection::new(CanvasDoc::genesis().unwrap());
    local.push(record_at(0.0, 0.0)).unwrap();
    local.push(record_at(1.0, 1.0)).unwrap();
    local.push(record_at(2.0, 2.0)).unwrap();

    let mut remote = local.doc_mut().fork();
    remote.corrupt_color(1, "beige").unwrap();

    local.merge(&mut remote).unwrap();
    assert_eq!(positions(&local), vec![Position::new(0.0, 0.0)]);
    assert_eq!(local.len(), 3);
}

// =============================================================
// Batched changes
// =============================================================

#[test]
fn batched_writes_through_doc_refresh_to_document_order() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    for top in [0.0, 1.0, 2.0] {
        projection.push(record_at(top, 0.0)).unwrap();
    }

    let doc = projection.doc_mut();
    doc.push(record_at(3.0, 0.0)).unwrap();
    doc.delete(1).unwrap();
    doc.push(record_at(4.0, 0.0)).unwrap();
    assert!(projection.refresh());

    let tops: Vec<f64> = projection.boxes().iter().map(|b| b.position.top).collect();
    assert_eq!(tops, vec![0.0, 2.0, 3.0, 4.0]);
    let expected = projection.doc_mut().records().unwrap();
    assert_eq!(projection.boxes(), expected.as_slice());
}

#[test]
fn batched_update_then_delete_keeps_fields_on_their_records() {
    let mut projection = Projection::new(CanvasDoc::genesis().unwrap());
    for top in [0.0, 1.0, 2.0] {
        projection.push(record_at(top, 0.0)).unwrap();
    }

    let doc = projection.doc_mut();
    doc.set_position(1, Position::new(10.0, 10.0)).unwrap();
    doc.delete(0).unwrap();
    projection.refresh();

    assert_eq!(positions(&projection), vec![Position::new(10.0, 10.0), Position::new(2.0, 0.0)]);
}
