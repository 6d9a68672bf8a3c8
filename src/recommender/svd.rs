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

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::error::{CfError, Result};
use crate::factorization::persist::Persistence;
use crate::factorization::{Factorization, Factorizer};
use crate::model::SharedModel;
use crate::recommender::{
    self, AllUnknownItemsStrategy, CandidateItemsStrategy, Recommender,
};
use crate::refresh::{Refreshable, RefreshHelper, RefreshedComponents};
use crate::topk::{self, Rescorer};
use crate::types::{ItemId, RecommendedItem, UserId};

/// Estimates preferences from a learned factorization instead of
/// neighborhoods.
///
/// Training happens at construction (or is skipped when a persisted
/// factorization can be loaded) and again on every refresh; the factorization
/// is swapped wholesale, and a failed retrain keeps serving the previous one.
/// Ids that entered the model after the last training round have no factor
/// rows yet; their estimates are NaN until a refresh.
pub struct SvdRecommender {
    model: SharedModel,
    factorizer: Arc<dyn Factorizer>,
    candidates: Arc<dyn CandidateItemsStrategy>,
    persistence: Option<Arc<dyn Persistence>>,
    factorization: RwLock<Factorization>,
    refresh_helper: RefreshHelper,
}

impl SvdRecommender {
    pub fn new<F>(model: SharedModel, factorizer: Arc<F>) -> Result<Self>
    where
        F: Factorizer + 'static,
    {
        Self::with_options(model, factorizer, Arc::new(AllUnknownItemsStrategy), None)
    }

    pub fn with_persistence<F, P>(
        model: SharedModel,
        factorizer: Arc<F>,
        persistence: Arc<P>,
    ) -> Result<Self>
    where
        F: Factorizer + 'static,
        P: Persistence + 'static,
    {
        Self::with_options(
            model,
            factorizer,
            Arc::new(AllUnknownItemsStrategy),
            Some(persistence as Arc<dyn Persistence>),
        )
    }

    pub fn with_options<F, C>(
        model: SharedModel,
        factorizer: Arc<F>,
        candidates: Arc<C>,
        persistence: Option<Arc<dyn Persistence>>,
    ) -> Result<Self>
    where
        F: Factorizer + 'static,
        C: CandidateItemsStrategy + 'static,
    {
        let factorization = match &persistence {
            Some(persistence) => match persistence.load()? {
                Some(loaded) => loaded,
                None => {
                    let trained = factorizer.factorize(&model.read().unwrap())?;
                    persistence.store(&trained)?;
                    trained
                }
            },
            None => factorizer.factorize(&model.read().unwrap())?,
        };

        Ok(SvdRecommender {
            model,
            factorizer,
            candidates,
            persistence,
            factorization: RwLock::new(factorization),
            refresh_helper: RefreshHelper::new(Vec::new()),
        })
    }

    /// Registers an upstream component (typically the file-backed model) to
    /// refresh before retraining.
    pub fn add_refresh_dependency(&mut self, dependency: Arc<dyn Refreshable>) {
        self.refresh_helper.add_dependency(dependency);
    }

    fn retrain(&self) -> Result<()> {
        let fresh = self.factorizer.factorize(&self.model.read().unwrap())?;
        if let Some(persistence) = &self.persistence {
            persistence.store(&fresh)?;
        }
        *self.factorization.write().unwrap() = fresh;
        Ok(())
    }

    fn estimate_or_no_opinion(
        &self,
        factorization: &Factorization,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<f32> {
        match factorization.estimate(user_id, item_id) {
            Ok(estimate) => Ok(estimate),
            // The model already vouched for the id; it is merely younger
            // than the factorization.
            Err(CfError::NoSuchUser(_)) | Err(CfError::NoSuchItem(_)) => Ok(f32::NAN),
            Err(other) => Err(other),
        }
    }
}

impl Recommender for SvdRecommender {
    fn recommend_with(
        &self,
        user_id: UserId,
        how_many: usize,
        rescorer: Option<&dyn Rescorer>,
    ) -> Result<Vec<RecommendedItem>> {
        let model = self.model.read().unwrap();
        let candidates = self.candidates.candidate_items(&model, user_id)?;
        let factorization = self.factorization.read().unwrap();
        debug!("scoring {} candidates for user {}", candidates.len(), user_id);

        let top = topk::top_items(how_many, candidates.iter(), rescorer, |item_id| {
            let estimate = self.estimate_or_no_opinion(&factorization, user_id, item_id)?;
            Ok(f64::from(recommender::cap_estimate(&model, estimate)))
        })?;
        Ok(top
            .into_iter()
            .map(|scored| RecommendedItem { item_id: scored.id, value: scored.score as f32 })
            .collect())
    }

    fn estimate_preference(&self, user_id: UserId, item_id: ItemId) -> Result<f32> {
        let model = self.model.read().unwrap();
        if !model.contains_user(user_id) {
            return Err(CfError::NoSuchUser(user_id));
        }
        if !model.contains_item(item_id) {
            return Err(CfError::NoSuchItem(item_id));
        }
        let factorization = self.factorization.read().unwrap();
        let estimate = self.estimate_or_no_opinion(&factorization, user_id, item_id)?;
        Ok(recommender::cap_estimate(&model, estimate))
    }

    fn set_preference(&self, user_id: UserId, item_id: ItemId, value: f32) -> Result<()> {
        recommender::set_model_preference(&self.model, user_id, item_id, value)
    }

    fn remove_preference(&self, user_id: UserId, item_id: ItemId) -> Result<()> {
        recommender::remove_model_preference(&self.model, user_id, item_id)
    }
}

impl Refreshable for SvdRecommender {
    fn refresh(&self, already_refreshed: &mut RefreshedComponents) {
        self.refresh_helper.refresh(already_refreshed, || {
            if let Err(error) = self.retrain() {
                warn!("keeping previous factorization, retraining failed: {}", error);
            }
        });
    }
}
