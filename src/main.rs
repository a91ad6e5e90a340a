fn main() {
    println!("tnseq-rs - TnSeq insertion density and essentiality simulation");
    println!();
    println!("Full analysis (join, genome map bins, simulation sweep):");
    println!("  tnseq    --pool-file POOL --genes-file genes.GC --hit-file POOL.hit \\");
    println!("           --chromosome-map chromosomes.tsv --output-dir results");
    println!();
    println!("Genome map tracks only (no simulation):");
    println!("  tn_bins  --pool-file POOL --genes-file genes.GC --hit-file POOL.hit \\");
    println!("           --chromosome-map chromosomes.tsv --output-dir tracks");
    println!();
    println!("For help with each tool:");
    println!("  cargo run --bin tnseq -- --help");
    println!("  cargo run --bin tn_bins -- --help");
}
