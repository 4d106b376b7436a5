//! Progress events emitted while a pipeline runs.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    LoadingPipeline,
    ReadingDrainage,
    BuildingConnectivity,
    ReadingGrid,
    CheckingCache,
    LoadingCachedWeights,
    BuildingWeights,
    ComputingInflow,
    ComputingMuskingum,
    WritingOutputs,
    Completed,
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::LoadingPipeline => "Loading pipeline",
            PipelineStage::ReadingDrainage => "Reading drainage",
            PipelineStage::BuildingConnectivity => "Connectivity",
            PipelineStage::ReadingGrid => "Reading grid",
            PipelineStage::CheckingCache => "Checking cache",
            PipelineStage::LoadingCachedWeights => "Loading cached weights",
            PipelineStage::BuildingWeights => "Weight table",
            PipelineStage::ComputingInflow => "Inflow",
            PipelineStage::ComputingMuskingum => "Muskingum",
            PipelineStage::WritingOutputs => "Writing outputs",
            PipelineStage::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: PipelineStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
}

impl ProgressEvent {
    pub fn stage(stage: PipelineStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
        }
    }
}
