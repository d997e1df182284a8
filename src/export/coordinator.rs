use anyhow::Context;
use indexmap::IndexMap;
use rayon::prelude::*;

use crate::classify::{Classification, InclusionFilter, NameClassifier};
use crate::config::{ExportConfig, OutputPaths};
use crate::error::{ExportError, ObjectError};
use crate::math::{round4, z_up_to_y_up};
use crate::reconcile::{reconcile, recenter, Reconciled, TransformChain};
use crate::scene_graph::{ObjectId, Scene};

use super::exporter::ModelExporter;
use super::mesh_id::MeshIdAllocator;
use super::metadata::{MetadataDocument, StructureRecord};
use super::staging::{StagedMesh, StagingCollection};
use super::summary::ExportSummary;

pub struct ExportOutput {
    /// Binary model bytes as produced by the exporter.
    pub model: Vec<u8>,
    pub metadata: MetadataDocument,
    pub summary: ExportSummary,
}

impl ExportOutput {
    /// Writes the model and the metadata, creating their directories.
    pub fn write(&self, paths: &OutputPaths) -> anyhow::Result<()> {
        for dir in [&paths.model_dir, &paths.metadata_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let model_path = paths.model_path();
        std::fs::write(&model_path, &self.model)
            .with_context(|| format!("Failed to write {}", model_path.display()))?;
        log::info!("Wrote model to {}", model_path.display());

        let metadata_path = paths.metadata_path();
        let mut json = self.metadata.to_json_pretty()?;
        json.push('\n');
        std::fs::write(&metadata_path, json)
            .with_context(|| format!("Failed to write {}", metadata_path.display()))?;
        log::info!(
            "Wrote metadata for {} structures to {}",
            self.metadata.structures.len(),
            metadata_path.display()
        );

        Ok(())
    }
}

/// Results of the per-object work that needs no shared state.
struct Prepared {
    object_id: ObjectId,
    chain: TransformChain,
    reconciled: Result<Reconciled, ObjectError>,
    classification: Classification,
}

pub struct ExportCoordinator<E: ModelExporter> {
    config: ExportConfig,
    filter: InclusionFilter,
    classifier: NameClassifier,
    exporter: E,
}

impl<E: ModelExporter> ExportCoordinator<E> {
    pub fn new(config: ExportConfig, exporter: E) -> Self {
        let filter = InclusionFilter::new(&config.filter);
        let classifier = NameClassifier::new(&config.classifier);

        Self {
            config,
            filter,
            classifier,
            exporter,
        }
    }

    pub fn exporter(&self) -> &E {
        &self.exporter
    }

    /// Filters, repositions and classifies the scene's structures and exports
    /// the survivors. Per-object failures are collected in the summary.
    pub fn run(&mut self, scene: &Scene) -> Result<ExportOutput, ExportError> {
        let mut summary = ExportSummary::default();

        let candidates = self.select_candidates(scene, &mut summary);
        if candidates.is_empty() {
            return Err(ExportError::NoCandidates);
        }
        summary.candidates = candidates.len();
        log::info!("Found {} candidate structures", candidates.len());

        let prepared = self.prepare(scene, &candidates);

        let mut staging = StagingCollection::create(self.config.staging_collection.as_str());
        let structures = self.stage_all(scene, prepared, &mut staging, &mut summary);

        if staging.is_empty() {
            return Err(ExportError::NothingExported {
                failed: summary.failures.len(),
                invalid: summary.invalid.len(),
            });
        }

        let model = self
            .exporter
            .export_selection(staging.selection(), &self.config.gltf)
            .map_err(ExportError::Exporter)?;

        let labels = &self.config.metadata;
        let metadata = MetadataDocument {
            version: labels.version.clone(),
            source: labels.source.clone(),
            region: labels.region.clone(),
            export_notes: labels.export_notes.clone(),
            structures,
        };

        Ok(ExportOutput {
            model,
            metadata,
            summary,
        })
    }

    fn select_candidates(&self, scene: &Scene, summary: &mut ExportSummary) -> Vec<ObjectId> {
        let filter = &self.filter;
        let verdicts: Vec<_> = scene
            .object_ids()
            .into_par_iter()
            .map(|object_id| (object_id, filter.evaluate(scene, object_id)))
            .collect();

        let mut candidates = Vec::new();
        for (object_id, verdict) in verdicts {
            match verdict {
                Ok(()) => candidates.push(object_id),
                Err(reason) => {
                    let name = scene
                        .get_object(object_id)
                        .map(|object| object.name.as_str())
                        .unwrap_or_default();
                    summary.record_rejection(name, reason);
                }
            }
        }

        candidates
    }

    fn prepare(&self, scene: &Scene, candidates: &[ObjectId]) -> Vec<Prepared> {
        let classifier = &self.classifier;
        let policy = &self.config.policy;
        let bounds = &self.config.bounds;

        candidates
            .par_iter()
            .filter_map(|&object_id| {
                let object = scene.get_object(object_id)?;
                let chain = TransformChain::from_scene(scene, object_id)?;

                let reconciled = match &object.mesh {
                    Some(mesh) => reconcile(&object.name, &chain, &mesh.positions, policy, bounds),
                    None => Err(ObjectError::MissingMesh),
                };
                let classification =
                    classifier.classify(&object.name, &scene.collection_names(object_id));

                Some(Prepared {
                    object_id,
                    chain,
                    reconciled,
                    classification,
                })
            })
            .collect()
    }

    fn stage_all(
        &self,
        scene: &Scene,
        prepared: Vec<Prepared>,
        staging: &mut StagingCollection,
        summary: &mut ExportSummary,
    ) -> IndexMap<String, StructureRecord> {
        let y_up = self.config.gltf.y_up;
        let mut mesh_ids = MeshIdAllocator::new();
        let mut structures = IndexMap::new();

        for prepared in prepared {
            let Some(object) = scene.get_object(prepared.object_id) else {
                continue;
            };
            let name = object.name.as_str();

            let reconciled = match prepared.reconciled {
                Ok(reconciled) => reconciled,
                Err(error) => {
                    log::warn!("Skipping {}: {}", name, error);
                    summary.record_failure(name, error);
                    continue;
                }
            };

            summary.record_method(reconciled.method);
            if let Some(distance) = reconciled.discrepancy {
                summary.record_discrepancy(name, distance);
            }

            let Some(placement) = prepared.chain.placement(reconciled.method) else {
                summary.record_invalid(name, reconciled.invalid_reason.unwrap_or_default());
                continue;
            };

            let baked = object
                .mesh
                .as_ref()
                .ok_or(ObjectError::MissingMesh)
                .and_then(|mesh| recenter(mesh, placement, reconciled.center));
            let mut mesh = match baked {
                Ok(mesh) => mesh,
                Err(error) => {
                    log::warn!("Skipping {}: {}", name, error);
                    summary.record_failure(name, error);
                    continue;
                }
            };

            let mut translation = reconciled.center;
            if y_up {
                translation = z_up_to_y_up(translation);
                for position in &mut mesh.positions {
                    *position = z_up_to_y_up(*position);
                }
                for normal in &mut mesh.normals {
                    *normal = z_up_to_y_up(*normal);
                }
            }

            let mesh_id = mesh_ids.allocate(name);
            let classification = prepared.classification;

            log::debug!(
                "{} -> {} ({}, layer {}, {})",
                name,
                mesh_id,
                classification.structure_type,
                classification.layer,
                reconciled.method
            );

            summary.record_export(classification.structure_type);
            if classification.needs_review {
                summary.needs_review.push(name.to_string());
            }

            structures.insert(
                mesh_id.clone(),
                StructureRecord {
                    mesh_id: mesh_id.clone(),
                    original_name: name.to_string(),
                    structure_type: classification.structure_type,
                    layer: classification.layer,
                    regions: classification.regions,
                    center: round4(z_up_to_y_up(reconciled.center)),
                },
            );

            staging.stage(StagedMesh {
                mesh_id,
                translation,
                mesh,
            });
        }

        structures
    }
}
