//! `promptseq template`: Print the CSV template.

pub fn run() {
    print!("{}", promptseq_sequencer::csv::template());
}
