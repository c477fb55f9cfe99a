// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs)]
/// coexnet - Weighted gene co-expression network analysis
pub struct Args {
    /// path to expression matrix (.tsv or .csv; samples x genes)
    #[argh(option)]
    pub expression: Option<String>,

    /// path to sample trait table (.tsv or .csv; samples x traits)
    #[argh(option)]
    pub traits: Option<String>,

    /// output directory for result tables (default: current directory)
    #[argh(option)]
    pub output_dir: Option<String>,

    /// analysis identifier used as output file prefix (default: coexnet)
    #[argh(option)]
    pub analysis_id: Option<String>,

    /// soft-threshold power (skips the power scan)
    #[argh(option)]
    pub power: Option<f64>,

    /// comma-separated candidate powers for the scan (default: 1-10, then even steps to 50)
    #[argh(option)]
    pub powers: Option<String>,

    /// target scale-free fit R^2 for automatic power selection (default: 0.8)
    #[argh(option, default = "0.8")]
    pub target_fit: f64,

    /// adjacency sign mode: signed, unsigned, signed-hybrid (default: signed)
    #[argh(option, default = "String::from(\"signed\")")]
    pub sign: String,

    /// minimum number of genes for a module (default: 30)
    #[argh(option, default = "30")]
    pub min_module_size: usize,

    /// branch cut height as a fraction of the tallest dendrogram merge (default: 0.99)
    #[argh(option, default = "0.99")]
    pub cut_height_fraction: f64,

    /// eigengene dissimilarity below which modules are merged (default: 0.25)
    #[argh(option, default = "0.25")]
    pub merge_cut_height: f64,

    /// TOM block size in genes, trades memory for speed (default: 2500)
    #[argh(option, default = "2500")]
    pub block_size: usize,

    /// minimum |kME| for hub genes (default: 0.7)
    #[argh(option, default = "0.7")]
    pub kme_threshold: f64,

    /// maximum kME p-value for hub genes (default: 0.05)
    #[argh(option, default = "0.05")]
    pub kme_pvalue: f64,

    /// trait column for gene significance (default: first trait column)
    #[argh(option)]
    pub trait_column: Option<String>,

    /// comma-separated module labels (colors or numbers) for hub extraction
    /// (default: modules with a significant trait association)
    #[argh(option)]
    pub hub_modules: Option<String>,

    /// module-trait p-value cutoff for automatic module-of-interest selection (default: 0.05)
    #[argh(option, default = "0.05")]
    pub module_pvalue: f64,

    /// output format: tsv, csv (default: tsv)
    #[argh(option, default = "String::from(\"tsv\")")]
    pub format: String,

    /// number of threads (default: auto-detect)
    #[argh(option)]
    pub threads: Option<usize>,

    /// include only genes matching regex pattern
    #[argh(option)]
    pub include_genes: Option<String>,

    /// exclude genes matching regex pattern
    #[argh(option)]
    pub exclude_genes: Option<String>,

    /// include only samples matching regex pattern
    #[argh(option)]
    pub include_samples: Option<String>,

    /// exclude samples matching regex pattern
    #[argh(option)]
    pub exclude_samples: Option<String>,

    /// include only genes listed in a file (one gene per line)
    #[argh(option)]
    pub include_genes_list: Option<String>,

    /// exclude genes listed in a file (one gene per line)
    #[argh(option)]
    pub exclude_genes_list: Option<String>,

    /// include only samples listed in a file (one sample per line)
    #[argh(option)]
    pub include_samples_list: Option<String>,

    /// exclude samples listed in a file (one sample per line)
    #[argh(option)]
    pub exclude_samples_list: Option<String>,

    /// run the soft-threshold power scan only, then exit
    #[argh(switch)]
    pub scan_only: bool,

    /// validate inputs without computation (dry run)
    #[argh(switch)]
    pub dry_run: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}
