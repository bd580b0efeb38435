use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use unnatural_core::{CorpusRegistry, RegistryConfig, Token};

const SAMPLE: &str = "\
import os
import sys

def main(args):
    for arg in args:
        if os.path.exists(arg):
            print(arg)
    return 0

if __name__ == \"__main__\":
    sys.exit(main(sys.argv))
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Build the stock corpora ('generic' and 'py'), persisted in "./data"
    // Statistics already stored there are loaded automatically
    let registry = CorpusRegistry::with_defaults(&RegistryConfig::new("./data"))?;
    let corpus = registry.lookup("py")?;

    // Train on a file given on the command line, or on the bundled sample
    let source = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE.to_owned(),
    };
    let trained = corpus.train(&corpus.tokenize(&source, true)?)?;
    println!("Trained on {} tokens", trained.tokens);

    // Naturalness of a familiar line and of a scrambled one
    // Lower cross-entropy means the code looks more like the corpus
    for line in ["import os\n", "os import\n"] {
        let tokens = corpus.tokenize(line, true)?;
        println!("{:?}: {:.3} bits", line.trim(), corpus.cross_entropy(&tokens)?);
    }

    // Asking for a prediction on text the tokenizer cannot read fails cleanly
    match corpus.tokenize("x = $", false) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Cannot tokenize 'x = $': {e}"),
    }

    // Continue some code by sampling each next token from the suggestions,
    // weighted by their probability
    let mut rng = rand::rng();
    let mut tokens: Vec<Token> = corpus.tokenize("for arg in", true)?;
    for _ in 0..8 {
        let prediction = corpus.predict(&tokens)?;
        if prediction.suggestions.is_empty() {
            break;
        }
        let weights = WeightedIndex::new(prediction.suggestions.iter().map(|s| s.probability))?;
        let next = &prediction.suggestions[weights.sample(&mut rng)];
        tokens.push(Token::from_lexeme(next.lexeme.as_str()));
    }
    let continuation: Vec<&str> = tokens.iter().map(|token| token.lexeme.as_str()).collect();
    println!("Sampled continuation: {}", continuation.join(" "));

    // Commit every live model to disk
    registry.shutdown()?;

    Ok(())
}
