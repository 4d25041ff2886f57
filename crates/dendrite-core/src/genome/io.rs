use crate::genome::genome::Genome;
use crate::genome::link_gene::LinkGene;
use crate::genome::node_gene::NodeGene;
use crate::genome::trait_gene::{NUM_TRAIT_PARAMS, TraitGene};
use dendrite_error::{NeatResult, dendrite_bail, dendrite_err};
use dendrite_net::{ActivationType, NeuronRole};
use std::io::{BufRead, Write};

/// Write a genome in the line-oriented plain text format:
///
/// ```text
/// genomestart <id>
/// trait <id> p1 p2 p3 p4 p5 p6 p7 p8
/// node <id> <trait_id> <node_kind:0|1> <neuron_role:0..3> <activator_name>
/// gene <trait_id> <in> <out> <weight> <recurrent> <innov> <mutnum> <enabled>
/// genomeend <id>
/// ```
///
/// A trait id of zero means "no trait". Floats print in Rust's shortest
/// round-trip form, so read-after-write reproduces the genome exactly.
pub fn write_genome<W: Write>(genome: &Genome, w: &mut W) -> NeatResult<()> {
    writeln!(w, "genomestart {}", genome.id)?;
    for t in &genome.traits {
        write!(w, "trait {}", t.id)?;
        for p in &t.params {
            write!(w, " {}", p)?;
        }
        writeln!(w)?;
    }
    for node in &genome.nodes {
        let kind = if node.is_sensor() { 1 } else { 0 };
        writeln!(
            w,
            "node {} {} {} {} {}",
            node.id,
            node.trait_id.unwrap_or(0),
            kind,
            node.role.code(),
            node.activation.name()
        )?;
    }
    for gene in &genome.genes {
        writeln!(
            w,
            "gene {} {} {} {} {} {} {} {}",
            gene.trait_id.unwrap_or(0),
            gene.in_node,
            gene.out_node,
            gene.weight,
            gene.recurrent,
            gene.innovation,
            gene.mutation_num,
            gene.enabled
        )?;
    }
    writeln!(w, "genomeend {}", genome.id)?;
    Ok(())
}

/// Read the first genome from a plain text stream.
pub fn read_genome<R: BufRead>(r: R) -> NeatResult<Genome> {
    let mut id: Option<i64> = None;
    let mut traits = Vec::new();
    let mut nodes = Vec::new();
    let mut genes = Vec::new();

    for line in r.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let mut fields = line.split_whitespace();
        let record = fields.next().unwrap_or("");
        let rest: Vec<&str> = fields.collect();

        match record {
            "genomestart" => {
                id = Some(parse_int(rest.first(), "genomestart id")?);
            }
            "trait" => traits.push(parse_trait(&rest)?),
            "node" => nodes.push(parse_node(&rest)?),
            "gene" => genes.push(parse_gene(&rest)?),
            "genomeend" => {
                let end_id: i64 = parse_int(rest.first(), "genomeend id")?;
                let Some(start_id) = id else {
                    dendrite_bail!(GenomeInvariant: "genomeend {} without genomestart", end_id);
                };
                if start_id != end_id {
                    dendrite_bail!(GenomeInvariant:
                        "genomestart {} closed by genomeend {}", start_id, end_id);
                }
                return Ok(Genome::from_parts(start_id, traits, nodes, genes));
            }
            other => {
                dendrite_bail!(GenomeInvariant: "unknown genome record '{}'", other);
            }
        }
    }

    Err(dendrite_err!(GenomeInvariant: "genome stream ended without genomeend"))
}

pub fn genome_to_string(genome: &Genome) -> NeatResult<String> {
    let mut buf = Vec::new();
    write_genome(genome, &mut buf)?;
    Ok(String::from_utf8(buf).expect("genome text is ascii"))
}

pub fn genome_from_str(text: &str) -> NeatResult<Genome> {
    read_genome(text.as_bytes())
}

fn parse_int(field: Option<&&str>, what: &str) -> NeatResult<i64> {
    field
        .and_then(|f| f.parse::<i64>().ok())
        .ok_or_else(|| dendrite_err!(GenomeInvariant: "missing or malformed {}", what))
}

fn parse_float(field: Option<&&str>, what: &str) -> NeatResult<f64> {
    field
        .and_then(|f| f.parse::<f64>().ok())
        .ok_or_else(|| dendrite_err!(GenomeInvariant: "missing or malformed {}", what))
}

fn parse_bool(field: Option<&&str>, what: &str) -> NeatResult<bool> {
    match field.copied() {
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        _ => Err(dendrite_err!(GenomeInvariant: "missing or malformed {}", what)),
    }
}

fn optional_trait(id: i64) -> Option<i64> {
    if id == 0 { None } else { Some(id) }
}

fn parse_trait(fields: &[&str]) -> NeatResult<TraitGene> {
    let id = parse_int(fields.first(), "trait id")?;
    let mut params = [0.0; NUM_TRAIT_PARAMS];
    for (i, slot) in params.iter_mut().enumerate() {
        *slot = parse_float(fields.get(i + 1), "trait param")?;
    }
    Ok(TraitGene::with_params(id, params))
}

fn parse_node(fields: &[&str]) -> NeatResult<NodeGene> {
    let id = parse_int(fields.first(), "node id")?;
    let trait_id = parse_int(fields.get(1), "node trait id")?;
    let kind = parse_int(fields.get(2), "node kind")?;
    let role_code = parse_int(fields.get(3), "node role")?;

    let role = NeuronRole::from_code(role_code as u8)
        .ok_or_else(|| dendrite_err!(GenomeInvariant: "node {}: bad role code {}", id, role_code))?;

    let expected_kind = if role.is_sensor() { 1 } else { 0 };
    if kind != expected_kind {
        dendrite_bail!(GenomeInvariant:
            "node {}: kind {} contradicts role {:?}", id, kind, role);
    }

    let activation = match fields.get(4) {
        Some(name) => ActivationType::from_name(name)?,
        None => ActivationType::SigmoidSteepened,
    };

    Ok(NodeGene::new(id, role)
        .with_activation(activation)
        .with_trait(optional_trait(trait_id)))
}

fn parse_gene(fields: &[&str]) -> NeatResult<LinkGene> {
    let trait_id = parse_int(fields.first(), "gene trait id")?;
    let in_node = parse_int(fields.get(1), "gene in-node")?;
    let out_node = parse_int(fields.get(2), "gene out-node")?;
    let weight = parse_float(fields.get(3), "gene weight")?;
    let recurrent = parse_bool(fields.get(4), "gene recurrent flag")?;
    let innovation = parse_int(fields.get(5), "gene innovation")?;
    let mutation_num = parse_float(fields.get(6), "gene mutation number")?;
    let enabled = parse_bool(fields.get(7), "gene enabled flag")?;

    let mut gene = LinkGene::new(in_node, out_node, weight, recurrent, innovation)
        .with_trait(optional_trait(trait_id))
        .with_mutation_num(mutation_num);
    gene.enabled = enabled;
    Ok(gene)
}
