use crate::genome::genome::Genome;
use dendrite_error::{NeatResult, dendrite_err};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// YAML genome documents wrap the genome under a single `genome` key so the
/// format stays open for sibling sections later.
#[derive(Serialize, Deserialize)]
struct GenomeDoc {
    genome: Genome,
}

pub fn write_genome_yaml<W: Write>(genome: &Genome, w: &mut W) -> NeatResult<()> {
    serde_yaml::to_writer(
        w,
        &GenomeDoc {
            genome: genome.clone(),
        },
    )
    .map_err(|e| dendrite_err!(GenomeInvariant: "yaml encode failed: {}", e))
}

pub fn read_genome_yaml<R: Read>(r: R) -> NeatResult<Genome> {
    let doc: GenomeDoc = serde_yaml::from_reader(r)
        .map_err(|e| dendrite_err!(GenomeInvariant: "yaml decode failed: {}", e))?;
    Ok(Genome::from_parts(
        doc.genome.id,
        doc.genome.traits,
        doc.genome.nodes,
        doc.genome.genes,
    ))
}

pub fn genome_to_yaml_string(genome: &Genome) -> NeatResult<String> {
    let mut buf = Vec::new();
    write_genome_yaml(genome, &mut buf)?;
    Ok(String::from_utf8(buf).expect("yaml output is utf8"))
}

pub fn genome_from_yaml_str(text: &str) -> NeatResult<Genome> {
    read_genome_yaml(text.as_bytes())
}
