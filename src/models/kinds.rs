use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Legal document kinds as they are stored in `legaldocuments.document_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, AsRefStr, EnumIter)]
pub enum DocumentType {
    #[strum(serialize = "LUẬT")]
    Law,
    #[strum(serialize = "BỘ LUẬT")]
    Code,
    #[strum(serialize = "HIẾN PHÁP")]
    Constitution,
    #[strum(serialize = "LỆNH")]
    Order,
    #[strum(serialize = "NGHỊ QUYẾT")]
    Resolution,
    #[strum(serialize = "NGHỊ ĐỊNH")]
    Decree,
    #[strum(serialize = "QUYẾT ĐỊNH")]
    Decision,
    #[strum(serialize = "THÔNG TƯ")]
    Circular,
    #[strum(serialize = "CHỈ THỊ")]
    Directive,
    #[strum(serialize = "CÔNG ĐIỆN")]
    Dispatch,
    #[strum(serialize = "CÔNG VĂN")]
    OfficialLetter,
    #[strum(serialize = "VĂN BẢN HỢP NHẤT")]
    Consolidated,
    #[strum(serialize = "VĂN BẢN KHÁC")]
    Other,
    #[strum(serialize = "THÔNG BÁO")]
    Notice,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Dictionary key used when matching page text, e.g. "Nghị định".
    pub fn keyword(&self) -> &'static str {
        match self {
            DocumentType::Law => "Luật",
            DocumentType::Code => "Bộ luật",
            DocumentType::Constitution => "Hiến pháp",
            DocumentType::Order => "Lệnh",
            DocumentType::Resolution => "Nghị quyết",
            DocumentType::Decree => "Nghị định",
            DocumentType::Decision => "Quyết định",
            DocumentType::Circular => "Thông tư",
            DocumentType::Directive => "Chỉ thị",
            DocumentType::Dispatch => "Công điện",
            DocumentType::OfficialLetter => "Công văn",
            DocumentType::Consolidated => "Văn bản hợp nhất",
            DocumentType::Other => "Văn bản khác",
            DocumentType::Notice => "Thông báo",
        }
    }

    /// All kinds in dictionary order. Matching walks this order, so "Luật"
    /// wins over "Bộ luật" for text containing both.
    pub fn all() -> Vec<DocumentType> {
        DocumentType::iter().collect()
    }
}

/// Kinds of templates stored in `documenttemplates.template_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, AsRefStr, EnumIter)]
pub enum TemplateType {
    #[strum(serialize = "Hợp đồng")]
    Contract,
    #[strum(serialize = "Đơn")]
    Application,
    #[strum(serialize = "Biên bản")]
    Minutes,
    #[strum(serialize = "Bản cam kết")]
    Commitment,
    #[strum(serialize = "Giấy ủy quyền")]
    PowerOfAttorney,
    #[strum(serialize = "Quyết định")]
    Decision,
    #[strum(serialize = "Thông báo")]
    Notice,
    #[strum(serialize = "Công văn")]
    OfficialLetter,
    #[strum(serialize = "Tờ khai")]
    Declaration,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn all() -> Vec<TemplateType> {
        TemplateType::iter().collect()
    }
}

/// Crawl targets selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum CrawlTarget {
    /// Legal documents (văn bản pháp luật)
    Legal,
    /// Contract and form templates (hợp đồng, biểu mẫu)
    Contracts,
}

impl CrawlTarget {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn all() -> Vec<CrawlTarget> {
        CrawlTarget::iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_document_type_labels() {
        assert_eq!(DocumentType::Decree.as_str(), "NGHỊ ĐỊNH");
        assert_eq!(DocumentType::Other.to_string(), "VĂN BẢN KHÁC");
        assert_eq!(DocumentType::from_str("THÔNG TƯ").unwrap(), DocumentType::Circular);
    }

    #[test]
    fn test_document_type_dictionary_order() {
        let all = DocumentType::all();
        assert_eq!(all.len(), 14);
        assert_eq!(all[0], DocumentType::Law);
        assert_eq!(all[1], DocumentType::Code);
        assert_eq!(all[13], DocumentType::Notice);
    }

    #[test]
    fn test_keyword_uppercases_to_label() {
        for kind in DocumentType::all() {
            assert_eq!(kind.keyword().to_uppercase(), kind.as_str());
        }
    }

    #[test]
    fn test_template_type_round_trip() {
        assert_eq!(TemplateType::from_str("Giấy ủy quyền").unwrap(), TemplateType::PowerOfAttorney);
        assert_eq!(TemplateType::Contract.to_string(), "Hợp đồng");
        assert_eq!(TemplateType::all().len(), 9);
    }

    #[test]
    fn test_crawl_target_from_string() {
        assert_eq!(CrawlTarget::from_str("legal").unwrap(), CrawlTarget::Legal);
        assert_eq!(CrawlTarget::from_str("contracts").unwrap(), CrawlTarget::Contracts);
        assert!(CrawlTarget::from_str("rss").is_err());
        assert_eq!(format!("{}", CrawlTarget::Contracts), "contracts");
    }
}
