//! Stitching of tile-internal line fragments that carry the same label.
//!
//! Vector tiles split long roads into many small features; labeling the
//! fragments independently would repeat the label at every split. Two
//! endpoint-keyed maps (one per line end) find fragments whose endpoint
//! exactly matches another fragment's start under the same label text,
//! including the 3-way case where one fragment bridges two others. Only
//! `symbol-placement: line` layers run this pass.

use std::collections::HashMap;

use crate::{
    geometry::GeometryCoordinates, layout::symbol_feature::SymbolGeometryTileFeature, util,
};

/// Key of one end of a labeled line: the label text hash plus the exact
/// integer endpoint.
fn end_key(text_hash: u64, line: &GeometryCoordinates, use_end: bool) -> u64 {
    let point = if use_end { line.last() } else { line.first() }.expect("line is not empty");
    util::hash(&[text_hash as i64, point.x as i64, point.y as i64])
}

/// Merge line features with identical label text whose endpoints meet
/// exactly. Merged-away features are removed; every surviving feature
/// keeps its first geometry as the (possibly extended) line.
pub fn merge_lines(features: &mut Vec<SymbolGeometryTileFeature>) {
    // Endpoint -> index into `merged`. `left` keys line starts, `right`
    // keys line ends.
    let mut left_index: HashMap<u64, usize> = HashMap::new();
    let mut right_index: HashMap<u64, usize> = HashMap::new();
    let mut merged: Vec<SymbolGeometryTileFeature> = Vec::new();
    let mut absorbed: Vec<bool> = Vec::new();

    fn merge_from_right(
        merged: &mut [SymbolGeometryTileFeature],
        left_index: &mut HashMap<u64, usize>,
        right_index: &mut HashMap<u64, usize>,
        left_key: u64,
        right_key: u64,
        geometry: &GeometryCoordinates,
    ) -> usize {
        let index = right_index.remove(&left_key).expect("caller checked the key");
        right_index.insert(right_key, index);
        let line = &mut merged[index].geometry[0];
        // The join point appears in both fragments; keep one copy.
        line.0.pop();
        line.0.extend_from_slice(&geometry.0);
        index
    }

    fn merge_from_left(
        merged: &mut [SymbolGeometryTileFeature],
        left_index: &mut HashMap<u64, usize>,
        right_index: &mut HashMap<u64, usize>,
        left_key: u64,
        right_key: u64,
        geometry: &GeometryCoordinates,
    ) -> usize {
        let index = left_index.remove(&right_key).expect("caller checked the key");
        left_index.insert(left_key, index);
        let line = &mut merged[index].geometry[0];
        let mut joined = geometry.0.clone();
        joined.extend_from_slice(&line.0[1..]);
        line.0 = joined;
        index
    }

    for feature in features.drain(..) {
        let text_hash = feature.formatted_text.as_ref().map(|text| text.text_hash());
        let mergeable = text_hash.is_some()
            && feature
                .geometry
                .first()
                .is_some_and(|line| !line.is_empty());
        if !mergeable {
            merged.push(feature);
            absorbed.push(false);
            continue;
        }
        let text_hash = text_hash.expect("checked above");
        let geometry = feature.geometry[0].clone();

        let left_key = end_key(text_hash, &geometry, false);
        let right_key = end_key(text_hash, &geometry, true);

        let extends_to_left = right_index.contains_key(&left_key);
        let extends_to_right = left_index.contains_key(&right_key);

        if extends_to_left
            && extends_to_right
            && right_index[&left_key] != left_index[&right_key]
        {
            // This fragment bridges two existing ones: append it to the
            // left fragment, then fold the right fragment onto that.
            let target = merge_from_left(
                &mut merged,
                &mut left_index,
                &mut right_index,
                left_key,
                right_key,
                &geometry,
            );
            let bridged_line = merged[target].geometry[0].clone();
            let survivor = merge_from_right(
                &mut merged,
                &mut left_index,
                &mut right_index,
                left_key,
                right_key,
                &bridged_line,
            );
            left_index.remove(&left_key);
            right_index.remove(&right_key);
            let survivor_right_key = end_key(text_hash, &merged[survivor].geometry[0], true);
            right_index.insert(survivor_right_key, survivor);
            absorbed[target] = true;
        } else if extends_to_left {
            merge_from_right(
                &mut merged,
                &mut left_index,
                &mut right_index,
                left_key,
                right_key,
                &geometry,
            );
        } else if extends_to_right {
            merge_from_left(
                &mut merged,
                &mut left_index,
                &mut right_index,
                left_key,
                right_key,
                &geometry,
            );
        } else {
            let index = merged.len();
            merged.push(feature);
            absorbed.push(false);
            left_index.insert(left_key, index);
            right_index.insert(right_key, index);
        }
    }

    let mut is_absorbed = absorbed.into_iter();
    merged.retain(|_| !is_absorbed.next().expect("one flag per feature"));
    *features = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{FeatureType, GeometryCoordinate, GeometryCoordinates},
        tagged_string::{SectionOptions, TaggedString},
    };

    fn fragment(text: &str, points: &[(i16, i16)]) -> SymbolGeometryTileFeature {
        let mut feature = SymbolGeometryTileFeature::new(
            FeatureType::LineString,
            vec![GeometryCoordinates(
                points
                    .iter()
                    .map(|(x, y)| GeometryCoordinate::new(*x, *y))
                    .collect(),
            )],
        );
        feature.formatted_text = Some(TaggedString::new_from_raw(
            text.into(),
            SectionOptions::new(1.0, vec![], None),
        ));
        feature
    }

    fn points(feature: &SymbolGeometryTileFeature) -> Vec<(i16, i16)> {
        feature.geometry[0].0.iter().map(|p| (p.x, p.y)).collect()
    }

    #[test]
    fn joins_fragments_sharing_an_endpoint() {
        let mut features = vec![fragment("A", &[(0, 0), (2, 0)]), fragment("A", &[(2, 0), (4, 0)])];
        merge_lines(&mut features);
        assert_eq!(features.len(), 1);
        assert_eq!(points(&features[0]), vec![(0, 0), (2, 0), (4, 0)]);
    }

    #[test]
    fn different_text_never_merges() {
        let mut features = vec![fragment("A", &[(0, 0), (2, 0)]), fragment("B", &[(2, 0), (4, 0)])];
        merge_lines(&mut features);
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn inexact_endpoints_never_merge() {
        let mut features = vec![fragment("A", &[(0, 0), (2, 0)]), fragment("A", &[(3, 0), (4, 0)])];
        merge_lines(&mut features);
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn bridge_fragment_merges_three_ways() {
        // The middle fragment arrives last and extends both neighbors.
        let mut features = vec![
            fragment("A", &[(0, 0), (2, 0)]),
            fragment("A", &[(4, 0), (6, 0)]),
            fragment("A", &[(2, 0), (4, 0)]),
        ];
        merge_lines(&mut features);
        assert_eq!(features.len(), 1);
        assert_eq!(points(&features[0]), vec![(0, 0), (2, 0), (4, 0), (6, 0)]);
    }

    #[test]
    fn prepends_when_matching_a_start() {
        let mut features = vec![fragment("A", &[(2, 0), (4, 0)]), fragment("A", &[(0, 0), (2, 0)])];
        merge_lines(&mut features);
        assert_eq!(features.len(), 1);
        assert_eq!(points(&features[0]), vec![(0, 0), (2, 0), (4, 0)]);
    }

    #[test]
    fn untexted_features_pass_through() {
        let mut plain = SymbolGeometryTileFeature::new(
            FeatureType::LineString,
            vec![GeometryCoordinates(vec![
                GeometryCoordinate::new(0, 0),
                GeometryCoordinate::new(2, 0),
            ])],
        );
        plain.index = 7;
        let mut features = vec![plain];
        merge_lines(&mut features);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].index, 7);
    }
}
