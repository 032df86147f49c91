/// Enum representing the supported taxonomy file layouts.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaxonomyPreset {
    /// SINTAX output run with a cutoff; the filtered lineage is in the fourth column
    SintaxFinal,

    /// SINTAX output, using the full lineage with its bootstrap confidences
    SintaxFull,

    /// Two columns: `CLUSTER<tab>TAXONOMY`
    Plain,
}

/// Returns the 0-based column holding the taxonomy string for a preset.
pub fn get_taxonomy_column(preset: &TaxonomyPreset) -> usize {
    match preset {
        TaxonomyPreset::SintaxFinal => 3,
        TaxonomyPreset::SintaxFull | TaxonomyPreset::Plain => 1,
    }
}
