//! Table definitions for the NCBI Taxonomy database
//!
//! Column names follow the historical layout of this database, including
//! the `inhericed_gc_flag` spelling, because downstream queries depend on it.

use taxdb_common::DumpFile;

use super::types::*;

/// Bumped whenever a table, column, key or index changes
pub const SCHEMA_VERSION: u32 = 1;

pub static NAME_CLASS: EnumType = EnumType {
    name: "name_class",
    values: &[
        "acronym",
        "anamorph",
        "authority",
        "blast name",
        "common name",
        "equivalent name",
        "genbank acronym",
        "genbank anamorph",
        "genbank common name",
        "genbank synonym",
        "includes",
        "in-part",
        "misnomer",
        "misspelling",
        "scientific name",
        "synonym",
        "teleomorph",
        "type material",
    ],
};

// =============================================================================
// Reference tables (no FK dependencies)
// =============================================================================

pub static DIVISION: TableSchema = TableSchema {
    name: "division",
    source: Some(DumpFile::Divisions),
    columns: &[
        Column::primary_key("division_id", ColumnType::Unsigned),
        Column::new("division_cde", ColumnType::VarChar(4)),
        Column::new("division_name", ColumnType::Text),
        Column::new("comments", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[],
};

pub static GENCODE: TableSchema = TableSchema {
    name: "gencode",
    source: Some(DumpFile::GeneticCodes),
    columns: &[
        Column::primary_key("genetic_code_id", ColumnType::Unsigned),
        Column::new("abbreviation", ColumnType::Text),
        Column::new("name", ColumnType::Text),
        Column::new("cde", ColumnType::Text),
        Column::new("starts", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[],
};

// =============================================================================
// Taxonomy tree
// =============================================================================

pub static NODES: TableSchema = TableSchema {
    name: "nodes",
    source: Some(DumpFile::Nodes),
    columns: &[
        Column::primary_key("tax_id", ColumnType::Unsigned),
        // Not a foreign key: the root is its own parent
        Column::required("parent_tax_id", ColumnType::Unsigned),
        Column::required("rank", ColumnType::VarChar(20)),
        Column::new("embl_code", ColumnType::VarChar(5)),
        Column::required("division_id", ColumnType::Unsigned),
        Column::required("inherited_div_flag", ColumnType::Boolean),
        Column::required("genetic_code_id", ColumnType::Unsigned),
        Column::required("inhericed_gc_flag", ColumnType::Boolean),
        Column::required("mitochondrial_genetic_code_id", ColumnType::Unsigned),
        Column::required("inherited_mgc_flag", ColumnType::Boolean),
        Column::required("genbank_hidden_flag", ColumnType::Boolean),
        Column::required("hidden_subtree_root_flag", ColumnType::Boolean),
        Column::new("comments", ColumnType::Text),
    ],
    foreign_keys: &[
        ForeignKey::new("division_id", "division", "division_id"),
        ForeignKey::new("genetic_code_id", "gencode", "genetic_code_id"),
    ],
    indexes: &[Index::on("division_id"), Index::on("genetic_code_id")],
};

pub static NAMES: TableSchema = TableSchema {
    name: "names",
    source: Some(DumpFile::Names),
    columns: &[
        Column::required("tax_id", ColumnType::Unsigned),
        Column::new("name_txt", ColumnType::Text),
        Column::new("unique_name", ColumnType::Text),
        Column::new("name_class", ColumnType::Enum("name_class")),
    ],
    foreign_keys: &[ForeignKey::new("tax_id", "nodes", "tax_id")],
    indexes: &[Index::on("tax_id")],
};

// =============================================================================
// History and citations (no FK enforcement)
// =============================================================================

pub static DELNODES: TableSchema = TableSchema {
    name: "delnodes",
    source: Some(DumpFile::DeletedNodes),
    columns: &[Column::required("tax_id", ColumnType::Unsigned)],
    foreign_keys: &[],
    indexes: &[],
};

pub static MERGED: TableSchema = TableSchema {
    name: "merged",
    source: Some(DumpFile::MergedNodes),
    columns: &[
        Column::required("old_tax_id", ColumnType::Unsigned),
        Column::required("new_tax_id", ColumnType::Unsigned),
    ],
    foreign_keys: &[],
    indexes: &[],
};

pub static CITATIONS: TableSchema = TableSchema {
    name: "citations",
    source: Some(DumpFile::Citations),
    columns: &[
        Column::required("cit_id", ColumnType::Unsigned),
        Column::new("cit_key", ColumnType::Text),
        Column::required("pubmed_id", ColumnType::Unsigned).with_default("0"),
        Column::required("medline_id", ColumnType::Unsigned).with_default("0"),
        Column::new("url", ColumnType::Text),
        Column::new("citation_text", ColumnType::Text),
        // Whitespace-separated tax ids, kept as published
        Column::new("taxid_list", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[],
};

/// Citation to taxon pairs split out of `citations.taxid_list`
///
/// Filled from `citations` after the bulk load, never from a dump file.
pub static CITATION_TAXA: TableSchema = TableSchema {
    name: "citation_taxa",
    source: None,
    columns: &[
        Column::required("cit_id", ColumnType::Unsigned),
        Column::required("tax_id", ColumnType::Unsigned),
    ],
    foreign_keys: &[],
    indexes: &[Index::on("cit_id"), Index::on("tax_id")],
};

/// Bulk-loaded tables in dependency order
pub static ALL_TABLES: &[&TableSchema] = &[
    // Referenced by nodes
    &DIVISION,
    &GENCODE,
    &NODES,
    // References nodes
    &NAMES,
    &DELNODES,
    &MERGED,
    &CITATIONS,
];

/// Get table schema by name
pub fn get_table(name: &str) -> Option<&'static TableSchema> {
    ALL_TABLES
        .iter()
        .copied()
        .chain(std::iter::once(&CITATION_TAXA))
        .find(|t| t.name == name)
}

/// Get all bulk-loaded table names, in load order
pub fn table_names() -> Vec<&'static str> {
    ALL_TABLES.iter().map(|t| t.name).collect()
}
