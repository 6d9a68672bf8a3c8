/*
 * Corater
 * Copyright (C) 2026 The corater developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::sync::Arc;

use crate::config::AlsConfig;
use crate::factorization::AlsWrFactorizer;
use crate::model::{self, DataModel};
use crate::neighborhood::NearestNUserNeighborhood;
use crate::recommender::{Recommender, SvdRecommender, UserBasedRecommender};
use crate::refresh;
use crate::similarity::{SimilarityMeasure, VectorSimilarity};

#[test]
fn programmatic_usage() {

    /* Our input data comprises of observed preferences: which user assigned
       which strength to which item. Identifiers are 64 bit integers; callers
       map their own identifiers onto them. */
    let preferences = vec![
        (1, 10, 5.0),
        (1, 11, 4.0),
        (1, 12, 1.0),
        (2, 10, 5.0),
        (2, 11, 4.5),
        (2, 12, 1.5),
        (2, 13, 4.8),
        (3, 10, 4.5),
        (3, 11, 4.0),
        (3, 12, 1.0),
        (3, 13, 4.2),
        (4, 10, 1.0),
        (4, 12, 5.0),
    ];

    /* The data model indexes the preferences both by user and by item, and is
       shared between all components of a recommender. */
    let model = model::shared(DataModel::from_preferences(preferences).unwrap());

    println!(
        "Loaded {} preferences of {} users for {} items.",
        model.read().unwrap().num_preferences(),
        model.read().unwrap().num_users(),
        model.read().unwrap().num_items(),
    );

    /* A user-based recommender composes a similarity metric and a
       neighborhood policy: here, the two most Pearson-similar users inform
       each recommendation. */
    let similarity = Arc::new(VectorSimilarity::new(SimilarityMeasure::PearsonCorrelation));
    let neighborhood = Arc::new(NearestNUserNeighborhood::new(2, *similarity).unwrap());
    let recommender =
        UserBasedRecommender::new(Arc::clone(&model), neighborhood, similarity);

    /* Users 2 and 3 agree with user 1 and both liked item 13, so that is what
       user 1 should be offered. */
    let recommendations = recommender.recommend(1, 3).unwrap();
    for recommendation in &recommendations {
        println!(
            "Recommending item {} to user 1 with strength {}",
            recommendation.item_id, recommendation.value,
        );
    }
    assert_eq!(recommendations[0].item_id, 13);

    /* Estimates answer the dual question: how much would a user like one
       specific item. Known preferences come back unchanged. */
    let estimate = recommender.estimate_preference(1, 13).unwrap();
    assert!(estimate > 3.0 && estimate <= 5.0);
    assert_eq!(recommender.estimate_preference(1, 10).unwrap(), 5.0);

    /* Alternatively, a latent-factor model learns dense feature vectors for
       every user and item and estimates with their dot products. The same
       Recommender interface applies. */
    let factorizer = Arc::new(
        AlsWrFactorizer::new(AlsConfig {
            num_features: 2,
            lambda: 0.1,
            num_iterations: 10,
            num_threads: 2,
            seed: Some(42),
            ..AlsConfig::default()
        })
        .unwrap(),
    );
    let svd = Arc::new(SvdRecommender::new(Arc::clone(&model), factorizer).unwrap());
    assert_eq!(svd.recommend(1, 1).unwrap()[0].item_id, 13);

    /* Preferences can be mutated through the recommender. The factorization
       does not know new items until the next refresh retrains it. */
    svd.set_preference(2, 14, 5.0).unwrap();
    svd.set_preference(3, 14, 4.7).unwrap();
    assert!(svd.estimate_preference(1, 14).unwrap().is_nan());

    refresh::refresh_now(&svd);
    let retrained = svd.estimate_preference(1, 14).unwrap();
    println!("After retraining, item 14 is estimated at {} for user 1", retrained);
    assert!(!retrained.is_nan());
}
